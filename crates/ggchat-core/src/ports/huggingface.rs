//! Remote model hub port.
//!
//! Core only needs three capabilities from the hub: list candidate
//! repositories for a tag, list a repository's files, and cheaply probe a
//! file's size. Transport details stay in the adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the hub client.
#[derive(Debug, Error)]
pub enum HfPortError {
    /// Repository or file does not exist.
    #[error("Not found on hub: {0}")]
    NotFound(String),

    /// Transport failure (DNS, TLS, timeout, 5xx after retries).
    #[error("Hub network error: {0}")]
    Network(String),

    /// The hub answered with something we could not interpret.
    #[error("Invalid hub response: {0}")]
    InvalidResponse(String),
}

/// A candidate repository returned by a tag search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HfCandidate {
    /// Repository id such as `TheBloke/Mistral-7B-Instruct-v0.1-GGUF`.
    pub id: String,
    /// Download count, used only for ordering.
    pub downloads: u64,
}

/// A file within a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HfFileInfo {
    /// Path relative to the repository root.
    pub path: String,
    /// Size when the listing included it.
    pub size: Option<u64>,
}

#[async_trait]
pub trait HfClientPort: Send + Sync {
    /// Up to `limit` repositories tagged with `tag`, most downloaded first.
    async fn list_candidates(
        &self,
        tag: &str,
        limit: u32,
    ) -> Result<Vec<HfCandidate>, HfPortError>;

    /// Every file in the repository's default revision.
    async fn list_files(&self, repo_id: &str) -> Result<Vec<HfFileInfo>, HfPortError>;

    /// Size of a single file via a metadata request.
    ///
    /// Returns `None` when the size cannot be determined; never fails.
    async fn probe_file_size(&self, repo_id: &str, file_name: &str) -> Option<u64>;
}
