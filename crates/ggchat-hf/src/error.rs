//! Internal error types for Hugging Face operations.
//!
//! These errors are internal to `ggchat-hf` and are mapped to core port
//! errors at the boundary.

use ggchat_core::HfPortError;
use thiserror::Error;

/// Result type alias for Hugging Face operations.
pub type HfResult<T> = Result<T, HfError>;

/// Errors related to Hugging Face API operations.
#[derive(Debug, Error)]
pub enum HfError {
    /// API request failed with an HTTP error status.
    #[error("HuggingFace API request failed with status {status}: {url}")]
    ApiRequestFailed { status: u16, url: String },

    /// API returned an invalid or unexpected response.
    #[error("Invalid response from HuggingFace API: {message}")]
    InvalidResponse { message: String },

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl From<HfError> for HfPortError {
    fn from(err: HfError) -> Self {
        match err {
            HfError::ApiRequestFailed { status: 404, url } => Self::NotFound(url),
            HfError::ApiRequestFailed { status, url } => {
                Self::Network(format!("request failed with status {status}: {url}"))
            }
            HfError::InvalidResponse { message } => Self::InvalidResponse(message),
            HfError::Network(e) => Self::Network(e.to_string()),
            HfError::InvalidUrl(e) => Self::InvalidResponse(format!("invalid URL: {e}")),
            HfError::JsonParse(e) => Self::InvalidResponse(e.to_string()),
        }
    }
}
