use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Failed to build HTTP client for the geocoding service")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Invalid geocoding endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse geocoding response from {0}")]
    JsonParse(String, #[source] serde_json::Error),

    #[error("Geocoding service returned an unusable coordinate for '{name}': {value}")]
    InvalidCoordinate { name: String, value: String },

    #[error("Lookup for '{name}' timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },
}

impl GeocodeError {
    /// Whether another attempt might succeed.
    ///
    /// Network failures, timeouts, throttling, server errors and malformed
    /// responses are transient. Client errors and bad coordinates are not.
    pub fn is_transient(&self) -> bool {
        match self {
            GeocodeError::NetworkRequest(..)
            | GeocodeError::JsonParse(..)
            | GeocodeError::Timeout { .. } => true,
            GeocodeError::HttpStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || status.is_server_error()
            }
            GeocodeError::ClientBuild(_)
            | GeocodeError::InvalidEndpoint(_)
            | GeocodeError::InvalidCoordinate { .. } => false,
        }
    }
}
