// src/client.rs

use crate::config::ClientConfig;
use crate::error::AlphaEarthError;
use crate::payout::{PayoutProgram, Product};
use crate::requests::NoQuery;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Reply of the backend's `GET /health` check.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct HealthCheckResponse {
    pub status: String,
    #[serde(default)]
    pub service: String,
}

/// The main client for the AlphaEarth Insurance backend.
///
/// `AlphaEarth` holds the normalized API base URL, the geocoder location and an underlying
/// `reqwest::Client` with default headers. Endpoint groups are exposed as methods directly
/// on the client (claims, flight delays, properties, disasters, geocoding) or through
/// handles borrowed from it ([`PayoutProgram`]).
///
/// ```rust,no_run
/// use alphaearth_rs::{AlphaEarth, AlphaEarthError, ClientConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), AlphaEarthError> {
/// let client = AlphaEarth::new(ClientConfig::new("http://localhost:5000/api"))?;
/// let health = client.health_check().await?;
/// println!("backend status: {}", health.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AlphaEarth {
    pub api_url: String,
    pub(crate) geocoder_url: String,
    pub(crate) config: ClientConfig,
    pub(crate) http_client: Client,
}

impl AlphaEarth {
    /// Creates a new `AlphaEarth` client.
    ///
    /// A missing scheme on `config.api_url` defaults to `http://`, and trailing slashes are
    /// trimmed so endpoint paths can be appended uniformly.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL cannot be used as a base or the user agent is not a
    /// valid header value.
    pub fn new(config: ClientConfig) -> Result<Self, AlphaEarthError> {
        let api_url = normalize_base_url(&config.api_url)?;
        let geocoder_url = normalize_base_url(&config.geocoder_url)?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).map_err(AlphaEarthError::InvalidHeaderValue)?,
        );

        let http_client = Client::builder()
            .default_headers(default_headers)
            .build()
            .map_err(AlphaEarthError::ReqwestError)?;

        log::debug!(
            "AlphaEarth initialized with api_url: {}, geocoder_url: {}",
            api_url,
            geocoder_url
        );

        Ok(Self {
            api_url,
            geocoder_url,
            config,
            http_client,
        })
    }

    /// Builds a client from `ALPHAEARTH_*` environment variables.
    pub fn from_env() -> Result<Self, AlphaEarthError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Calls `GET health` with the short health timeout.
    ///
    /// Any failure is reported as [`AlphaEarthError::BackendUnavailable`].
    pub async fn health_check(&self) -> Result<HealthCheckResponse, AlphaEarthError> {
        self._request(
            Method::GET,
            "health",
            None::<&Value>,
            None::<&NoQuery>,
            Some(self.config.health_timeout),
        )
        .await
        .map_err(|e| {
            log::error!("Health check failed: {}", e);
            AlphaEarthError::BackendUnavailable
        })
    }

    /// Handle for the flight insurance policy and payout routes.
    pub fn flight_program(&self) -> PayoutProgram<'_> {
        PayoutProgram::new(self, Product::Flight)
    }

    /// Handle for the parametric insurance policy and payout routes.
    pub fn parametric_program(&self) -> PayoutProgram<'_> {
        PayoutProgram::new(self, Product::Parametric)
    }

    pub(crate) fn endpoint_url(&self, endpoint: &str) -> Result<Url, AlphaEarthError> {
        let full = format!("{}/{}", self.api_url, endpoint.trim_start_matches('/'));
        Url::parse(&full).map_err(|e| {
            AlphaEarthError::InvalidUrl(format!(
                "Failed to join base URL '{}' with endpoint '{}': {}",
                self.api_url, endpoint, e
            ))
        })
    }

    pub(crate) async fn _request<T, Q, R>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&T>,
        query: Option<&Q>,
        timeout: Option<Duration>,
    ) -> Result<R, AlphaEarthError>
    where
        T: Serialize + Send + Sync + ?Sized,
        Q: Serialize + Send + Sync + ?Sized,
        R: DeserializeOwned + Send + 'static,
    {
        let full_url = self.endpoint_url(endpoint)?;
        let timeout = timeout.unwrap_or(self.config.request_timeout);

        log::debug!(
            "Preparing request: Method={}, URL={}, Timeout={:?}",
            method,
            full_url.as_str(),
            timeout
        );

        let mut request_builder = self
            .http_client
            .request(method.clone(), full_url.clone())
            .timeout(timeout);

        if let Some(query) = query {
            request_builder = request_builder.query(query);
        }

        if let Some(body_data) = body {
            let body_str = serde_json::to_string(body_data).map_err(AlphaEarthError::JsonError)?;
            log::debug!("Request body: {}", body_str);
            request_builder = request_builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body_str);
        } else {
            log::debug!("Request body: None");
        }

        let response = request_builder
            .send()
            .await
            .map_err(AlphaEarthError::from_transport)?;

        let status = response.status();
        let response_url = response.url().to_string();
        let body_bytes = response
            .bytes()
            .await
            .map_err(AlphaEarthError::from_transport)?;

        if status.is_success() {
            log::debug!(
                "Request to '{}' succeeded with status {}. Body: {}",
                response_url,
                status,
                String::from_utf8_lossy(&body_bytes)
            );
            if body_bytes.is_empty() || status == reqwest::StatusCode::NO_CONTENT {
                // Lets `()` and `Option<_>` stand in for empty replies.
                return serde_json::from_str("null").map_err(|_| {
                    AlphaEarthError::JsonDeserializationFailed(format!(
                        "'{}' returned an empty body",
                        response_url
                    ))
                });
            }
            serde_json::from_slice::<R>(&body_bytes).map_err(|e| {
                log::error!(
                    "JSON deserialization failed for successful response from '{}'. Status: {}. Error: {}. Body: {}",
                    response_url,
                    status,
                    e,
                    String::from_utf8_lossy(&body_bytes)
                );
                AlphaEarthError::JsonDeserializationFailed(format!(
                    "Failed to deserialize response from '{}': {}",
                    response_url, e
                ))
            })
        } else {
            let error_body_str = String::from_utf8_lossy(&body_bytes).to_string();
            log::warn!(
                "Request to '{}' failed with status {}. Response body: {}",
                response_url,
                status,
                error_body_str
            );
            let json_value = serde_json::from_slice::<Value>(&body_bytes).unwrap_or(Value::Null);
            Err(AlphaEarthError::from_response(status.as_u16(), json_value))
        }
    }
}

/// Ensures a scheme, validates that the URL can serve as a base, and trims trailing slashes.
/// Percent-encodes `value` as a single path segment so ids cannot add segments, a query
/// or a fragment to the endpoint they are placed in.
pub(crate) fn path_segment(value: &str) -> Result<String, AlphaEarthError> {
    let value = value.trim();
    if value.is_empty() || value == "." || value == ".." {
        return Err(AlphaEarthError::Validation(format!(
            "'{}' is not a valid path segment",
            value
        )));
    }
    let mut url = Url::parse("http://localhost/")?;
    url.path_segments_mut()
        .map_err(|_| AlphaEarthError::InvalidUrl("cannot build a path segment".to_string()))?
        .pop_if_empty()
        .push(value);
    Ok(url.path().trim_start_matches('/').to_string())
}

fn normalize_base_url(raw: &str) -> Result<String, AlphaEarthError> {
    let trimmed = raw.trim();
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    let parsed = Url::parse(&with_scheme)?;
    if parsed.cannot_be_a_base() || parsed.host_str().is_none() {
        return Err(AlphaEarthError::InvalidUrl(format!(
            "'{}' cannot be used as a base URL (e.g. http://localhost:5000/api)",
            raw
        )));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
