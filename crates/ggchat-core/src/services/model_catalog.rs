//! Model catalog - local scan, curated list and remote discovery.
//!
//! Listings are cached for a configurable TTL. A refresh builds the new
//! snapshot off to the side and swaps it in whole, so concurrent readers see
//! either the previous snapshot or the new one.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::domain::model::{name_from_file, name_from_repo_id};
use crate::domain::quantization::select_preferred_artifact;
use crate::domain::{CURATED_MODELS, ModelDescriptor};
use crate::ports::{
    CoreError, HfCandidate, HfClientPort, ModelFetcherPort, model_fetcher::partial_path,
};

/// Default freshness window for the catalog cache.
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(30 * 60);

/// Hub tag identifying GGUF repositories.
pub const GGUF_TAG: &str = "gguf";

/// Catalog configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Directory holding installed artifacts.
    pub models_dir: PathBuf,
    /// How long a listing stays fresh.
    pub ttl: Duration,
    /// Maximum number of remote candidates per refresh.
    pub remote_limit: u32,
}

impl CatalogConfig {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            ttl: DEFAULT_CATALOG_TTL,
            remote_limit: 20,
        }
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub const fn with_remote_limit(mut self, limit: u32) -> Self {
        self.remote_limit = limit;
        self
    }
}

struct CatalogSnapshot {
    entries: Vec<ModelDescriptor>,
    refreshed_at: Instant,
}

/// A local artifact found by the directory scan.
struct LocalArtifact {
    file_name: String,
    size_bytes: u64,
}

pub struct ModelCatalog {
    config: CatalogConfig,
    hub: Arc<dyn HfClientPort>,
    fetcher: Arc<dyn ModelFetcherPort>,
    cache: RwLock<Option<Arc<CatalogSnapshot>>>,
    refresh_gate: Mutex<()>,
    download_gate: Mutex<()>,
}

impl ModelCatalog {
    pub fn new(
        config: CatalogConfig,
        hub: Arc<dyn HfClientPort>,
        fetcher: Arc<dyn ModelFetcherPort>,
    ) -> Self {
        Self {
            config,
            hub,
            fetcher,
            cache: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            download_gate: Mutex::new(()),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.config.models_dir
    }

    /// List models, serving the cached snapshot while it is fresh.
    ///
    /// Remote discovery failures degrade to local and curated entries.
    pub async fn list_models(&self, force_refresh: bool) -> Vec<ModelDescriptor> {
        if !force_refresh {
            if let Some(snapshot) = self.fresh_snapshot().await {
                return snapshot.entries.clone();
            }
        }

        // One refresh at a time; later callers reuse the result.
        let _gate = self.refresh_gate.lock().await;
        if !force_refresh {
            if let Some(snapshot) = self.fresh_snapshot().await {
                return snapshot.entries.clone();
            }
        }

        let entries = self.build_entries().await;
        let snapshot = Arc::new(CatalogSnapshot {
            entries,
            refreshed_at: Instant::now(),
        });
        *self.cache.write().await = Some(Arc::clone(&snapshot));
        debug!(count = snapshot.entries.len(), "Catalog refreshed");
        snapshot.entries.clone()
    }

    /// Mark the cache stale so the next listing rebuilds it.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Local path for `name`, only if the artifact exists right now.
    ///
    /// Never contacts the hub: names resolve against the last snapshot, even
    /// an expired one, plus a fresh scan of the models directory.
    pub async fn resolve_path(&self, name: &str) -> Result<PathBuf, CoreError> {
        let descriptor = self
            .offline_entries()
            .await
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| CoreError::ModelNotInstalled(name.to_string()))?;

        let path = self.config.models_dir.join(&descriptor.file_name);
        if is_file(&path).await {
            Ok(path)
        } else {
            debug!(model = %name, "Model known but artifact missing on disk");
            Err(CoreError::ModelNotInstalled(name.to_string()))
        }
    }

    /// Ensure the artifact for `name` is on disk, downloading it if needed.
    ///
    /// Idempotent: an installed model returns immediately without a fetch.
    pub async fn ensure_downloaded(&self, name: &str) -> Result<PathBuf, CoreError> {
        let descriptor = self
            .find(name)
            .await
            .ok_or_else(|| CoreError::ModelNotInstalled(name.to_string()))?;
        let path = self.config.models_dir.join(&descriptor.file_name);
        if is_file(&path).await {
            return Ok(path);
        }

        let Some(repo_id) = descriptor.repo_id.as_deref() else {
            return Err(CoreError::ModelNotInstalled(name.to_string()));
        };

        let _gate = self.download_gate.lock().await;
        // Another caller may have finished the same download while we waited.
        if is_file(&path).await {
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.config.models_dir)
            .await
            .map_err(|e| CoreError::DownloadFailure {
                model: name.to_string(),
                reason: format!("cannot create models directory: {e}"),
            })?;

        info!(model = %name, repo = %repo_id, file = %descriptor.file_name, "Downloading model");
        match self
            .fetcher
            .fetch_file(repo_id, &descriptor.file_name, &self.config.models_dir)
            .await
        {
            Ok(fetched) => {
                self.invalidate().await;
                info!(model = %name, "Model download complete");
                Ok(fetched)
            }
            Err(e) => {
                warn!(model = %name, repo = %repo_id, error = %e, "Model download failed");
                remove_if_present(&partial_path(&path)).await;
                Err(CoreError::DownloadFailure {
                    model: name.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn find(&self, name: &str) -> Option<ModelDescriptor> {
        self.list_models(false)
            .await
            .into_iter()
            .find(|d| d.name == name)
    }

    async fn offline_entries(&self) -> Vec<ModelDescriptor> {
        let snapshot = self.cache.read().await.as_ref().map(Arc::clone);
        let known: Vec<ModelDescriptor> = match snapshot {
            Some(snapshot) => snapshot
                .entries
                .iter()
                .filter(|d| d.repo_id.is_some())
                .cloned()
                .map(|mut d| {
                    d.installed = false;
                    d
                })
                .collect(),
            None => CURATED_MODELS.iter().map(|c| c.descriptor()).collect(),
        };
        merge_entries(known, scan_local(&self.config.models_dir).await)
    }

    async fn fresh_snapshot(&self) -> Option<Arc<CatalogSnapshot>> {
        let guard = self.cache.read().await;
        guard
            .as_ref()
            .filter(|s| s.refreshed_at.elapsed() < self.config.ttl)
            .map(Arc::clone)
    }

    async fn build_entries(&self) -> Vec<ModelDescriptor> {
        let local = scan_local(&self.config.models_dir).await;
        let remote = self.discover_remote().await;

        let curated = CURATED_MODELS.iter().map(|c| c.descriptor());
        merge_entries(curated.chain(remote), local)
    }

    async fn discover_remote(&self) -> Vec<ModelDescriptor> {
        let candidates = match self
            .hub
            .list_candidates(GGUF_TAG, self.config.remote_limit)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "Remote model discovery failed, using local models only");
                return Vec::new();
            }
        };

        let resolved = join_all(candidates.iter().map(|c| self.resolve_candidate(c))).await;
        resolved.into_iter().flatten().collect()
    }

    async fn resolve_candidate(&self, candidate: &HfCandidate) -> Option<ModelDescriptor> {
        let files = match self.hub.list_files(&candidate.id).await {
            Ok(files) => files,
            Err(e) => {
                debug!(repo = %candidate.id, error = %e, "Skipping candidate, file listing failed");
                return None;
            }
        };

        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        let file_name = select_preferred_artifact(&paths)?.to_string();
        let listed_size = files
            .iter()
            .find(|f| f.path == file_name)
            .and_then(|f| f.size);
        let size_bytes = match listed_size {
            Some(size) => Some(size),
            None => self.hub.probe_file_size(&candidate.id, &file_name).await,
        };

        let mut descriptor = ModelDescriptor::new(
            name_from_repo_id(&candidate.id),
            Some(candidate.id.clone()),
            file_name,
        );
        descriptor.size_bytes = size_bytes;
        Some(descriptor)
    }
}

/// Merge remote-capable entries with the local scan.
///
/// Entries are deduplicated by filename (first wins) and by name (falling
/// back to the repository id). Local files mark their entry installed; local
/// files without a remote counterpart become local-only entries.
fn merge_entries(
    remote: impl IntoIterator<Item = ModelDescriptor>,
    local: Vec<LocalArtifact>,
) -> Vec<ModelDescriptor> {
    let mut entries: Vec<ModelDescriptor> = Vec::new();
    let mut by_file: HashMap<String, usize> = HashMap::new();
    let mut names: HashSet<String> = HashSet::new();

    for mut descriptor in remote {
        if by_file.contains_key(&descriptor.file_name) {
            continue;
        }
        if names.contains(&descriptor.name) {
            match descriptor.repo_id.clone() {
                Some(repo_id) if !names.contains(&repo_id) => descriptor.name = repo_id,
                _ => {
                    debug!(name = %descriptor.name, "Dropping duplicate catalog name");
                    continue;
                }
            }
        }
        names.insert(descriptor.name.clone());
        by_file.insert(descriptor.file_name.clone(), entries.len());
        entries.push(descriptor);
    }

    for artifact in local {
        if let Some(&idx) = by_file.get(&artifact.file_name) {
            let entry = &mut entries[idx];
            entry.installed = true;
            entry.size_bytes = Some(artifact.size_bytes);
            continue;
        }

        let mut name = name_from_file(&artifact.file_name);
        if names.contains(&name) {
            name.clone_from(&artifact.file_name);
        }
        if names.contains(&name) {
            continue;
        }

        let mut descriptor = ModelDescriptor::new(name, None, artifact.file_name.clone());
        descriptor.installed = true;
        descriptor.size_bytes = Some(artifact.size_bytes);
        names.insert(descriptor.name.clone());
        by_file.insert(descriptor.file_name.clone(), entries.len());
        entries.push(descriptor);
    }

    entries
}

async fn scan_local(models_dir: &Path) -> Vec<LocalArtifact> {
    let mut dir = match tokio::fs::read_dir(models_dir).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "Cannot read models directory");
            return Vec::new();
        }
    };

    let mut found = Vec::new();
    loop {
        let entry = match dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Models directory scan interrupted");
                break;
            }
        };
        let Ok(file_name) = entry.file_name().into_string() else {
            continue;
        };
        if !file_name.to_ascii_lowercase().ends_with(".gguf") {
            continue;
        }
        match entry.metadata().await {
            Ok(meta) if meta.is_file() => found.push(LocalArtifact {
                file_name,
                size_bytes: meta.len(),
            }),
            _ => {}
        }
    }

    found.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    found
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file())
}

async fn remove_if_present(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(error = %e, "Could not remove partial download"),
    }
}
