//! API error types

use thiserror::Error;

/// Errors from the campaign REST API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether a caller could reasonably try again
    ///
    /// Campaign creation is not idempotent, so the client itself never
    /// retries; this only informs what the wizard tells the user.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(err) => err.is_timeout() || err.is_connect(),
            ApiError::Api { status, .. } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            ApiError::Json(_) => false,
        }
    }
}
