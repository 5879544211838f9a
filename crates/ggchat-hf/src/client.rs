//! `HuggingFace` client and its `HfClientPort` implementation.

use async_trait::async_trait;
use ggchat_core::ports::huggingface::{HfCandidate, HfClientPort, HfFileInfo, HfPortError};
use tracing::debug;
use url::Url;

use crate::config::HfClientConfig;
use crate::endpoints::{build_resolve_url, build_search_url, build_tree_url};
use crate::error::HfResult;
use crate::http::{HttpBackend, ReqwestBackend};
use crate::models::{HfModelSummary, HfTreeEntry};

// ============================================================================
// Type Aliases
// ============================================================================

/// Default `HuggingFace` client using the reqwest HTTP backend.
pub type DefaultHfClient = HfClient<ReqwestBackend>;

// ============================================================================
// Client
// ============================================================================

/// Client for the three hub queries the catalog needs.
///
/// Generic over the HTTP backend so tests can swap in canned responses.
/// Use [`DefaultHfClient`] in production.
pub struct HfClient<B: HttpBackend> {
    backend: B,
    api_base: Url,
    resolve_root: Url,
}

impl DefaultHfClient {
    /// Create a new client with the given configuration.
    ///
    /// Fails when a configured URL does not parse or the HTTP client cannot
    /// be initialized.
    pub fn new(config: &HfClientConfig) -> HfResult<Self> {
        let api_base = Url::parse(&config.base_url)?;
        let resolve_root = directory_url(&config.resolve_url)?;
        Ok(Self {
            backend: ReqwestBackend::new(config)?,
            api_base,
            resolve_root,
        })
    }
}

impl<B: HttpBackend> HfClient<B> {
    #[cfg(test)]
    pub(crate) fn with_backend(backend: B) -> Self {
        let config = HfClientConfig::default();
        Self {
            backend,
            api_base: Url::parse(&config.base_url).unwrap(),
            resolve_root: directory_url(&config.resolve_url).unwrap(),
        }
    }
}

/// Parse `raw` so that relative joins append to its path.
fn directory_url(raw: &str) -> HfResult<Url> {
    if raw.ends_with('/') {
        Ok(Url::parse(raw)?)
    } else {
        Ok(Url::parse(&format!("{raw}/"))?)
    }
}

fn to_candidate(model: HfModelSummary) -> HfCandidate {
    HfCandidate {
        id: model.id,
        downloads: model.downloads,
    }
}

#[async_trait]
impl<B: HttpBackend> HfClientPort for HfClient<B> {
    async fn list_candidates(
        &self,
        tag: &str,
        limit: u32,
    ) -> Result<Vec<HfCandidate>, HfPortError> {
        let url = build_search_url(&self.api_base, tag, limit);
        let models: Vec<HfModelSummary> = self.backend.get_json(&url).await?;
        debug!(tag, count = models.len(), "Hub search returned candidates");
        Ok(models.into_iter().map(to_candidate).collect())
    }

    async fn list_files(&self, repo_id: &str) -> Result<Vec<HfFileInfo>, HfPortError> {
        let url = build_tree_url(&self.api_base, repo_id);
        let entries: Vec<HfTreeEntry> = self.backend.get_json(&url).await?;
        Ok(entries
            .into_iter()
            .filter(HfTreeEntry::is_file)
            .map(|entry| HfFileInfo {
                size: entry.file_size(),
                path: entry.path,
            })
            .collect())
    }

    async fn probe_file_size(&self, repo_id: &str, file_name: &str) -> Option<u64> {
        let url = match build_resolve_url(&self.resolve_root, repo_id, file_name) {
            Ok(url) => url,
            Err(e) => {
                debug!(repo_id, file_name, error = %e, "Cannot build probe URL");
                return None;
            }
        };
        match self.backend.head_size(&url).await {
            Ok(size) => size,
            Err(e) => {
                debug!(repo_id, file_name, error = %e, "File size probe failed");
                None
            }
        }
    }
}
