//! `SQLite` implementation of the `SettingsRepository` trait.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use ggchat_core::{GenerationSettings, RepositoryError, SettingsRepository};

/// `SQLite` implementation of the `SettingsRepository` trait.
///
/// Stores settings as a JSON blob in a key-value table for flexibility.
pub struct SqliteSettingsRepository {
    pool: SqlitePool,
}

impl SqliteSettingsRepository {
    /// Create a new `SQLite` settings repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const GENERATION_KEY: &str = "generation_settings";

#[async_trait]
impl SettingsRepository for SqliteSettingsRepository {
    async fn load_generation(&self) -> Result<Option<GenerationSettings>, RepositoryError> {
        let row = sqlx::query("SELECT value FROM settings_kv WHERE key = ?")
            .bind(GENERATION_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        match row {
            Some(r) => {
                let json: String = r.get("value");
                serde_json::from_str(&json)
                    .map(Some)
                    .map_err(|e| RepositoryError::Serialization(e.to_string()))
            }
            None => Ok(None),
        }
    }

    async fn save_generation(&self, settings: &GenerationSettings) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(settings)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let updated_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

        sqlx::query("INSERT OR REPLACE INTO settings_kv (key, value, updated_at) VALUES (?, ?, ?)")
            .bind(GENERATION_KEY)
            .bind(&json)
            .bind(&updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;

    #[tokio::test]
    async fn test_load_returns_none_when_empty() {
        let repo = SqliteSettingsRepository::new(setup_test_database().await.unwrap());
        assert_eq!(repo.load_generation().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let repo = SqliteSettingsRepository::new(setup_test_database().await.unwrap());

        let settings = GenerationSettings {
            max_tokens: 1024,
            temperature: 0.3,
            top_p: 0.8,
        };
        repo.save_generation(&settings).await.unwrap();
        repo.save_generation(&settings).await.unwrap();

        assert_eq!(repo.load_generation().await.unwrap(), Some(settings));
    }

    #[tokio::test]
    async fn test_corrupt_value_is_a_serialization_error() {
        let pool = setup_test_database().await.unwrap();
        sqlx::query("INSERT INTO settings_kv (key, value, updated_at) VALUES (?, '{oops', 'now')")
            .bind(GENERATION_KEY)
            .execute(&pool)
            .await
            .unwrap();

        let repo = SqliteSettingsRepository::new(pool);
        let err = repo.load_generation().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Serialization(_)));
    }
}
