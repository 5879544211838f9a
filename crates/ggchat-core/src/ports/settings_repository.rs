//! Settings repository trait definition.
//!
//! This port defines the interface for persisting the global generation
//! settings. Implementations handle all storage details internally.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::GenerationSettings;

/// Repository for generation settings persistence.
///
/// # Design Rules
///
/// - No `sqlx` types in signatures
/// - Works with domain `GenerationSettings` directly
/// - Implementation handles JSON serialization internally
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Load stored settings. `None` when nothing was saved yet.
    async fn load_generation(&self) -> Result<Option<GenerationSettings>, RepositoryError>;

    /// Save settings, replacing any stored value.
    async fn save_generation(&self, settings: &GenerationSettings) -> Result<(), RepositoryError>;
}
