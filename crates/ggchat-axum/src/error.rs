//! Axum-specific error types and mappings.
//!
//! Maps [`CoreError`] onto HTTP status codes and a JSON body. Server-side
//! failures are logged in full and answered with a generic message, so
//! response bodies never carry filesystem paths or engine output.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ggchat_core::CoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (invalid input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = ErrorBody {
            error: message,
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<CoreError> for HttpError {
    fn from(err: CoreError) -> Self {
        if err.is_not_found() {
            return Self::NotFound(err.to_string());
        }
        if err.is_validation() {
            return Self::BadRequest(err.to_string());
        }

        error!(error = %err, "Request failed");
        let message = match err {
            CoreError::LoadFailure { model, .. } => format!("Failed to load model '{model}'"),
            CoreError::DownloadFailure { model, .. } => format!("Download failed for '{model}'"),
            CoreError::EngineNotReady => "No model is loaded".to_string(),
            CoreError::Generation(_) => "Generation failed".to_string(),
            CoreError::PersistenceFailure(_) => "Storage failure".to_string(),
            other => other.to_string(),
        };
        Self::Internal(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ggchat_core::SettingsError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CoreError::ChatNotFound("c".into()), StatusCode::NOT_FOUND),
            (CoreError::ModelNotInstalled("m".into()), StatusCode::NOT_FOUND),
            (CoreError::InvalidRequest("empty".into()), StatusCode::BAD_REQUEST),
            (
                CoreError::Settings(SettingsError::TopPOutOfRange(1.5)),
                StatusCode::BAD_REQUEST,
            ),
            (CoreError::EngineNotReady, StatusCode::INTERNAL_SERVER_ERROR),
            (
                CoreError::Generation("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let response = HttpError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_internal_messages_hide_details() {
        let err = HttpError::from(CoreError::LoadFailure {
            model: "Mistral-7B-Instruct".into(),
            reason: "Model file not found: /home/me/models/m.gguf".into(),
        });
        let HttpError::Internal(message) = err else {
            panic!("expected internal error");
        };
        assert_eq!(message, "Failed to load model 'Mistral-7B-Instruct'");
    }
}
