//! Generation settings service - the process-wide sampling defaults.
//!
//! Settings are cached in memory and written through to the repository.
//! Per-query overrides never touch the stored value.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::{GenerationParams, GenerationSettings};
use crate::ports::{CoreError, SettingsRepository};

pub struct GenerationSettingsService {
    repo: Arc<dyn SettingsRepository>,
    current: RwLock<GenerationSettings>,
}

impl GenerationSettingsService {
    /// Create the service with built-in defaults. Call [`Self::reload`] to
    /// pick up stored values.
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        Self {
            repo,
            current: RwLock::new(GenerationSettings::default()),
        }
    }

    /// Load stored settings, falling back to defaults when none or invalid.
    pub async fn reload(&self) -> Result<GenerationSettings, CoreError> {
        let loaded = match self.repo.load_generation().await? {
            Some(stored) => match stored.validate() {
                Ok(()) => stored,
                Err(e) => {
                    warn!(error = %e, "Stored generation settings are invalid, using defaults");
                    GenerationSettings::default()
                }
            },
            None => GenerationSettings::default(),
        };
        *self.current.write().await = loaded;
        Ok(loaded)
    }

    pub async fn current(&self) -> GenerationSettings {
        *self.current.read().await
    }

    /// Current settings with per-query overrides applied and validated.
    pub async fn effective(
        &self,
        overrides: &GenerationParams,
    ) -> Result<GenerationSettings, CoreError> {
        let merged = self.current().await.with_overrides(overrides);
        merged.validate()?;
        Ok(merged)
    }

    /// Apply a partial update, persist it and make it current.
    ///
    /// Nothing changes when validation or the write fails.
    pub async fn update(&self, params: GenerationParams) -> Result<GenerationSettings, CoreError> {
        let mut current = self.current.write().await;
        let updated = current.with_overrides(&params);
        updated.validate()?;
        self.repo.save_generation(&updated).await?;
        *current = updated;
        info!(
            max_tokens = updated.max_tokens,
            temperature = updated.temperature,
            top_p = updated.top_p,
            "Generation settings updated"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemorySettings;

    #[tokio::test]
    async fn test_defaults_without_stored_value() {
        let service = GenerationSettingsService::new(Arc::new(InMemorySettings::new()));
        let loaded = service.reload().await.unwrap();
        assert_eq!(loaded, GenerationSettings::default());
    }

    #[tokio::test]
    async fn test_reload_picks_up_stored_value() {
        let stored = GenerationSettings {
            max_tokens: 128,
            temperature: 0.2,
            top_p: 0.5,
        };
        let service =
            GenerationSettingsService::new(Arc::new(InMemorySettings::with_stored(stored)));
        service.reload().await.unwrap();
        assert_eq!(service.current().await, stored);
    }

    #[tokio::test]
    async fn test_invalid_stored_value_falls_back_to_defaults() {
        let stored = GenerationSettings {
            max_tokens: 0,
            temperature: 0.2,
            top_p: 0.5,
        };
        let service =
            GenerationSettingsService::new(Arc::new(InMemorySettings::with_stored(stored)));
        assert_eq!(service.reload().await.unwrap(), GenerationSettings::default());
    }

    #[tokio::test]
    async fn test_update_persists_partial_change() {
        let repo = Arc::new(InMemorySettings::new());
        let service =
            GenerationSettingsService::new(Arc::clone(&repo) as Arc<dyn SettingsRepository>);

        let updated = service
            .update(GenerationParams {
                temperature: Some(1.1),
                ..GenerationParams::default()
            })
            .await
            .unwrap();

        assert!((updated.temperature - 1.1).abs() < f32::EPSILON);
        assert_eq!(updated.max_tokens, 512);
        assert_eq!(repo.stored(), Some(updated));
        assert_eq!(service.current().await, updated);
    }

    #[tokio::test]
    async fn test_rejected_update_changes_nothing() {
        let repo = Arc::new(InMemorySettings::new());
        let service =
            GenerationSettingsService::new(Arc::clone(&repo) as Arc<dyn SettingsRepository>);

        let err = service
            .update(GenerationParams {
                top_p: Some(1.5),
                ..GenerationParams::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(repo.stored(), None);

        repo.set_fail_saves(true);
        let err = service
            .update(GenerationParams {
                max_tokens: Some(64),
                ..GenerationParams::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PersistenceFailure(_)));
        assert_eq!(service.current().await, GenerationSettings::default());
    }

    #[tokio::test]
    async fn test_effective_applies_overrides_without_storing() {
        let repo = Arc::new(InMemorySettings::new());
        let service =
            GenerationSettingsService::new(Arc::clone(&repo) as Arc<dyn SettingsRepository>);

        let effective = service
            .effective(&GenerationParams {
                max_tokens: Some(16),
                ..GenerationParams::default()
            })
            .await
            .unwrap();
        assert_eq!(effective.max_tokens, 16);
        assert_eq!(service.current().await.max_tokens, 512);
        assert_eq!(repo.stored(), None);

        let err = service
            .effective(&GenerationParams {
                max_tokens: Some(100_000),
                ..GenerationParams::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}
