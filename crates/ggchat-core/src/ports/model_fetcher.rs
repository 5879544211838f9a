//! Model artifact fetcher port.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Suffix of the in-progress download next to the final artifact.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Errors that can occur while fetching a model artifact.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Remote file not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Insufficient disk space: need {required} bytes, {available} available")]
    InsufficientSpace { required: u64, available: u64 },

    #[error("Download interrupted after {bytes_downloaded} bytes")]
    Interrupted { bytes_downloaded: u64 },
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Fetches one file of a remote repository into a local directory.
///
/// Implementations stream into [`partial_path`] and rename on completion,
/// resuming from an existing partial file when the server allows ranges.
#[async_trait]
pub trait ModelFetcherPort: Send + Sync {
    /// Fetch `file_name` from `repo_id` into `dest_dir`, returning the final path.
    async fn fetch_file(
        &self,
        repo_id: &str,
        file_name: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, FetchError>;
}

/// Path of the in-progress download for `final_path`.
pub fn partial_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path_appends_suffix() {
        let path = Path::new("/models/model.Q4_K_M.gguf");
        assert_eq!(
            partial_path(path),
            PathBuf::from("/models/model.Q4_K_M.gguf.part")
        );
    }
}
