//! Data and models directory resolution.
//!
//! Resolution order for both directories:
//! 1. Explicit path provided by caller (highest priority)
//! 2. Environment variable (`GGCHAT_DATA_DIR` / `GGCHAT_MODELS_DIR`)
//! 3. Platform default under the user's local data directory

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "GGCHAT_DATA_DIR";

/// Environment variable overriding the models directory.
pub const MODELS_DIR_ENV: &str = "GGCHAT_MODELS_DIR";

/// Database filename inside the data directory.
pub const DATABASE_FILE: &str = "ggchat.db";

/// Errors that can occur during path resolution and directory operations.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the system data directory.
    #[error("Cannot determine system data directory")]
    NoDataDir,

    /// A path was expected to be a directory but was not.
    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    /// Failed to create a directory.
    #[error("Failed to create directory {path}: {reason}")]
    CreateFailed { path: PathBuf, reason: String },

    /// An empty path was provided.
    #[error("Path cannot be empty")]
    EmptyPath,
}

/// How a directory was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirSource {
    /// The caller passed an explicit path (CLI flag).
    Explicit,
    /// The path came from the environment or `.env`.
    EnvVar,
    /// Platform default.
    Default,
}

/// Resolution result for the data directory.
#[derive(Debug, Clone)]
pub struct DataDirResolution {
    pub path: PathBuf,
    pub source: DirSource,
}

/// Resolution result for the models directory.
#[derive(Debug, Clone)]
pub struct ModelsDirResolution {
    pub path: PathBuf,
    pub source: DirSource,
}

fn explicit_or_env(
    explicit: Option<&Path>,
    var: &str,
) -> Result<Option<(PathBuf, DirSource)>, PathError> {
    if let Some(path) = explicit {
        if path.as_os_str().is_empty() {
            return Err(PathError::EmptyPath);
        }
        return Ok(Some((path.to_path_buf(), DirSource::Explicit)));
    }

    if let Ok(value) = env::var(var) {
        if !value.trim().is_empty() {
            return Ok(Some((PathBuf::from(value.trim()), DirSource::EnvVar)));
        }
    }

    Ok(None)
}

/// Platform default data directory (`<local data dir>/ggchat`).
pub fn data_root() -> Result<PathBuf, PathError> {
    let base = dirs::data_local_dir().ok_or(PathError::NoDataDir)?;
    Ok(base.join("ggchat"))
}

/// Resolve the data directory holding the database.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<DataDirResolution, PathError> {
    if let Some((path, source)) = explicit_or_env(explicit, DATA_DIR_ENV)? {
        return Ok(DataDirResolution { path, source });
    }
    Ok(DataDirResolution {
        path: data_root()?,
        source: DirSource::Default,
    })
}

/// Resolve the models directory.
///
/// Defaults to `models/` inside the resolved data directory.
pub fn resolve_models_dir(
    explicit: Option<&Path>,
    data_dir: &Path,
) -> Result<ModelsDirResolution, PathError> {
    if let Some((path, source)) = explicit_or_env(explicit, MODELS_DIR_ENV)? {
        return Ok(ModelsDirResolution { path, source });
    }
    Ok(ModelsDirResolution {
        path: data_dir.join("models"),
        source: DirSource::Default,
    })
}

/// Path of the `SQLite` database inside `data_dir`.
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}

/// Create `path` (and parents) if missing, rejecting non-directories.
pub fn ensure_directory(path: &Path) -> Result<(), PathError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(PathError::NotADirectory(path.to_path_buf()));
        }
        return Ok(());
    }
    std::fs::create_dir_all(path).map_err(|e| PathError::CreateFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
