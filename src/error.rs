// src/error.rs
use reqwest::header::InvalidHeaderValue;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlphaEarthError {
    #[error("HTTP request failed: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("URL parsing failed: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON processing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parsing failed: {0}")]
    DateParseError(#[from] chrono::ParseError),

    #[error("JSON deserialization failed: {0}")]
    JsonDeserializationFailed(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Geocoding failed: {0}")]
    Geocode(String),

    #[error("Unrecognized payload: {0}")]
    UnrecognizedPayload(String),

    #[error("Backend is unavailable. Please ensure the API server is running.")]
    BackendUnavailable,

    #[error("Network error: unable to connect to the server ({0})")]
    Network(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Endpoint not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(InvalidHeaderValue),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl AlphaEarthError {
    /// Creates an `AlphaEarthError` from an HTTP status code and a JSON response body.
    ///
    /// The message is taken from `detail`, then `message`, then `error`, falling back to
    /// `"Server error (<status>)"` when the body carries none of them.
    pub(crate) fn from_response(status_code: u16, response_body: Value) -> Self {
        let detail = ["detail", "message", "error"]
            .iter()
            .find_map(|key| response_body.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string);

        match status_code {
            502 | 503 => AlphaEarthError::BackendUnavailable,
            500 => match detail {
                Some(d) if d.contains("Earth Engine") || d.contains("GEE") => {
                    AlphaEarthError::Server(format!("Earth Engine error: {}", d))
                }
                Some(d) if d.contains("timeout") || d.contains("Timeout") => {
                    AlphaEarthError::Timeout(
                        "the request took too long, try a smaller area or different dates"
                            .to_string(),
                    )
                }
                Some(d) => AlphaEarthError::Server(d),
                None => AlphaEarthError::Server(
                    "the backend is experiencing issues, please try again in a moment"
                        .to_string(),
                ),
            },
            400 => AlphaEarthError::BadRequest(detail.unwrap_or_else(|| {
                "please check your input and try again".to_string()
            })),
            401 | 403 => AlphaEarthError::Unauthorized(
                detail.unwrap_or_else(|| format!("HTTP {}", status_code)),
            ),
            404 => AlphaEarthError::NotFound(
                detail.unwrap_or_else(|| "please contact support".to_string()),
            ),
            _ => AlphaEarthError::Api {
                status: status_code,
                message: detail.unwrap_or_else(|| format!("Server error ({})", status_code)),
            },
        }
    }

    /// Classifies a transport-level failure: timeouts and connection failures get their own
    /// variants so callers can show a meaningful notification.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AlphaEarthError::Timeout(
                "the processing is taking longer than expected, please try again".to_string(),
            )
        } else if err.is_connect() {
            AlphaEarthError::Network(err.to_string())
        } else {
            AlphaEarthError::ReqwestError(err)
        }
    }
}
