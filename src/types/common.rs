use crate::error::AlphaEarthError;
use serde::{Deserialize, Serialize};

/// The `{"success": ..., "data": ..., "error": ...}` wrapper most backend routes reply with.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiEnvelope<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub count: Option<u64>,
}

fn default_success() -> bool {
    true
}

impl<T> ApiEnvelope<T> {
    /// Unwraps `data`, turning `success: false` or a missing payload into an error.
    pub fn into_data(self, endpoint: &str) -> Result<T, AlphaEarthError> {
        if !self.success {
            return Err(AlphaEarthError::Api {
                status: 200,
                message: self
                    .error
                    .unwrap_or_else(|| format!("'{}' reported failure", endpoint)),
            });
        }
        self.data.ok_or_else(|| {
            AlphaEarthError::UnrecognizedPayload(format!(
                "'{}' responded without a data field",
                endpoint
            ))
        })
    }
}

/// An admin's credentials, required by the payout approval routes.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminCredentials {
    pub admin_email: String,
    pub admin_password: String,
}

impl AdminCredentials {
    pub fn new(admin_email: impl Into<String>, admin_password: impl Into<String>) -> Self {
        AdminCredentials {
            admin_email: admin_email.into(),
            admin_password: admin_password.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), AlphaEarthError> {
        if self.admin_email.trim().is_empty() || self.admin_password.is_empty() {
            return Err(AlphaEarthError::Validation(
                "Admin credentials required".to_string(),
            ));
        }
        Ok(())
    }
}
