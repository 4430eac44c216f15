// src/config.rs

use crate::error::AlphaEarthError;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "AlphaEarth-Insurance/1.0";

/// Connection settings for an [`AlphaEarth`](crate::AlphaEarth) client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the backend API, e.g. `http://localhost:5000/api`.
    pub api_url: String,
    /// Base URL of the Nominatim-compatible geocoder.
    pub geocoder_url: String,
    /// Sent on every request; Nominatim rejects anonymous clients.
    pub user_agent: String,
    /// Timeout for ordinary requests.
    pub request_timeout: Duration,
    /// Timeout for claim processing, which can run for tens of minutes server-side.
    pub claim_timeout: Duration,
    /// Timeout for the health check.
    pub health_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_url: DEFAULT_API_URL.to_string(),
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(5 * 60),
            claim_timeout: Duration::from_secs(60 * 60),
            health_timeout: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        ClientConfig {
            api_url: api_url.into(),
            ..Default::default()
        }
    }

    pub fn with_geocoder_url(mut self, geocoder_url: impl Into<String>) -> Self {
        self.geocoder_url = geocoder_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_claim_timeout(mut self, timeout: Duration) -> Self {
        self.claim_timeout = timeout;
        self
    }

    /// Reads the configuration from the process environment.
    ///
    /// Recognized variables: `ALPHAEARTH_API_URL`, `ALPHAEARTH_GEOCODER_URL`,
    /// `ALPHAEARTH_USER_AGENT`, `ALPHAEARTH_TIMEOUT_SECS`, `ALPHAEARTH_CLAIM_TIMEOUT_SECS`.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, AlphaEarthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AlphaEarthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ClientConfig::default();
        if let Some(url) = lookup("ALPHAEARTH_API_URL") {
            config.api_url = url;
        }
        if let Some(url) = lookup("ALPHAEARTH_GEOCODER_URL") {
            config.geocoder_url = url;
        }
        if let Some(agent) = lookup("ALPHAEARTH_USER_AGENT") {
            config.user_agent = agent;
        }
        if let Some(secs) = lookup("ALPHAEARTH_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("ALPHAEARTH_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("ALPHAEARTH_CLAIM_TIMEOUT_SECS") {
            config.claim_timeout = parse_secs("ALPHAEARTH_CLAIM_TIMEOUT_SECS", &secs)?;
        }
        log::debug!("Loaded client configuration: {:?}", config);
        Ok(config)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, AlphaEarthError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| AlphaEarthError::Validation(format!("{} must be whole seconds: {}", key, e)))
}
