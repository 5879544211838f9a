//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `sqlx`, `reqwest` or process types in any signature
//! - Each port has its own error enum; services map them into [`CoreError`]

pub mod accelerator;
pub mod chat_history;
pub mod huggingface;
pub mod inference;
pub mod model_fetcher;
pub mod settings_repository;

use std::sync::Arc;
use thiserror::Error;

use crate::domain::SettingsError;

pub use accelerator::{AcceleratorError, AcceleratorProbe};
pub use chat_history::{ChatHistoryError, ChatHistoryRepository};
pub use huggingface::{HfCandidate, HfClientPort, HfFileInfo, HfPortError};
pub use inference::{
    Completion, CompletionRequest, EngineConfig, EngineError, EngineFactory, InferenceEngine,
};
pub use model_fetcher::{FetchError, ModelFetcherPort, partial_path};
pub use settings_repository::SettingsRepository;

/// Container for all repository trait objects.
///
/// Lives in `ggchat-core` so that `AppCore` can accept it without depending
/// on `ggchat-db`.
#[derive(Clone)]
pub struct Repos {
    /// Chat and message persistence.
    pub chat_history: Arc<dyn ChatHistoryRepository>,
    /// Generation settings persistence.
    pub settings: Arc<dyn SettingsRepository>,
}

impl Repos {
    /// Create a new Repos container.
    pub fn new(
        chat_history: Arc<dyn ChatHistoryRepository>,
        settings: Arc<dyn SettingsRepository>,
    ) -> Self {
        Self {
            chat_history,
            settings,
        }
    }
}

/// Domain-specific errors for repository operations.
///
/// Abstracts away storage implementation details (e.g., sqlx errors).
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Storage backend error (database, filesystem, etc.).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Core error type for semantic domain errors.
///
/// This is the canonical error type used across the core domain.
/// Adapters map it to their own error types (HTTP status codes, exit codes).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad input, correctable by the caller.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The chat id does not reference an existing chat.
    #[error("Chat not found: {0}")]
    ChatNotFound(String),

    /// The model is unknown or its artifact is not on disk.
    #[error("Model not installed: {0}")]
    ModelNotInstalled(String),

    /// The inference engine could not be constructed.
    #[error("Failed to load model '{model}': {reason}")]
    LoadFailure { model: String, reason: String },

    /// Generation was requested while no model is loaded.
    #[error("No model is loaded")]
    EngineNotReady,

    /// The engine failed while generating.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Network or storage failure while fetching a model. Retryable.
    #[error("Download failed for '{model}': {reason}")]
    DownloadFailure { model: String, reason: String },

    /// Store unavailable or constraint violation.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Generation settings out of range.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl CoreError {
    /// Whether the error denotes a missing resource.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ChatNotFound(_) | Self::ModelNotInstalled(_))
    }

    /// Whether the error is caused by caller input.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidRequest(_) | Self::Settings(_))
    }
}

impl From<ChatHistoryError> for CoreError {
    fn from(err: ChatHistoryError) -> Self {
        match err {
            ChatHistoryError::ChatNotFound(id) => Self::ChatNotFound(id),
            ChatHistoryError::InvalidSender(sender) => {
                Self::InvalidRequest(format!("invalid sender: {sender}"))
            }
            ChatHistoryError::EmptyContent => {
                Self::InvalidRequest("message content must not be empty".to_string())
            }
            ChatHistoryError::Database(msg) => Self::PersistenceFailure(msg),
        }
    }
}

impl From<RepositoryError> for CoreError {
    fn from(err: RepositoryError) -> Self {
        Self::PersistenceFailure(err.to_string())
    }
}
