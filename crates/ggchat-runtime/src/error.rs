//! Error types for the llama-server runtime.

use std::path::PathBuf;

use ggchat_core::EngineError;
use thiserror::Error;

/// Errors that can occur while running llama-server.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Model file does not exist on disk.
    #[error("Model file not found: {path}")]
    ModelMissing { path: PathBuf },

    /// The binary could not be started.
    #[error("Failed to spawn llama-server: {0}")]
    Spawn(#[source] std::io::Error),

    /// No loopback port could be reserved.
    #[error("No free port available: {0}")]
    PortUnavailable(#[source] std::io::Error),

    /// The child exited before or while serving.
    #[error("llama-server exited ({status})")]
    Exited { status: String },

    /// Health check did not pass in time.
    #[error("llama-server not ready after {secs}s")]
    StartupTimeout { secs: u64 },

    /// The server answered with an error status.
    #[error("llama-server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Transport failure talking to the server.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Process shutdown failed: {0}")]
    Shutdown(#[source] std::io::Error),
}

impl RuntimeError {
    pub fn into_construct(self) -> EngineError {
        EngineError::Construct(self.to_string())
    }

    /// Map a failure during generation. A child that already exited is dead.
    pub fn into_generate(self) -> EngineError {
        match self {
            Self::Exited { .. } => EngineError::Dead(self.to_string()),
            other => EngineError::Generate(other.to_string()),
        }
    }
}

impl From<RuntimeError> for EngineError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Shutdown(_) => Self::Release(err.to_string()),
            RuntimeError::Status { .. } | RuntimeError::Http(_) => Self::Generate(err.to_string()),
            _ => Self::Construct(err.to_string()),
        }
    }
}
