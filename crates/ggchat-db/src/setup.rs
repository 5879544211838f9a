//! Database setup and initialization.
//!
//! This module provides the `setup_database()` function for initializing
//! the `SQLite` database with full schema. Entry points call this with the
//! resolved database path.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::debug;

/// Sets up the `SQLite` database connection and ensures the schema exists.
///
/// Creates the parent directory and the database file when missing, enables
/// foreign keys on every connection and applies the schema.
///
/// # Example
///
/// ```rust,no_run
/// use ggchat_db::setup_database;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let db_path = Path::new("/path/to/ggchat.db");
/// let pool = setup_database(db_path).await?;
/// # Ok(())
/// # }
/// ```
pub async fn setup_database(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .create_if_missing(true)
                .foreign_keys(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(5)),
        )
        .await?;

    create_schema(&pool).await?;
    debug!(path = %db_path.display(), "Database ready");

    Ok(pool)
}

/// Sets up an in-memory `SQLite` database for testing.
///
/// A single connection keeps every query on the same in-memory database.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_database() -> Result<SqlitePool> {
    let options: SqliteConnectOptions = "sqlite::memory:".parse()?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options.foreign_keys(true))
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Creates the complete database schema.
///
/// Safe to call multiple times as all statements use IF NOT EXISTS.
async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chats (
            id TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            model_used TEXT,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
            last_modified_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id TEXT NOT NULL,
            sender TEXT NOT NULL CHECK(sender IN ('user', 'assistant')),
            content TEXT NOT NULL CHECK(length(trim(content)) > 0),
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
            FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_messages_chat_order ON messages(chat_id, created_at, id)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chats_last_modified ON chats(last_modified_at)")
        .execute(pool)
        .await?;

    // Every insert advances the owning chat's activity timestamp.
    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS trg_messages_touch_chat
        AFTER INSERT ON messages
        BEGIN
            UPDATE chats SET last_modified_at = NEW.created_at WHERE id = NEW.chat_id;
        END
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings_kv (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_setup_creates_file_and_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("ggchat.db");

        let pool = setup_database(&path).await.unwrap();
        assert!(path.exists());
        create_schema(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_schema_enforces_sender_and_content() {
        let pool = setup_test_database().await.unwrap();
        sqlx::query("INSERT INTO chats (id, title) VALUES ('c1', 't')")
            .execute(&pool)
            .await
            .unwrap();

        let bad_sender =
            sqlx::query("INSERT INTO messages (chat_id, sender, content) VALUES ('c1', 'system', 'x')")
                .execute(&pool)
                .await;
        assert!(bad_sender.is_err());

        let blank =
            sqlx::query("INSERT INTO messages (chat_id, sender, content) VALUES ('c1', 'user', '   ')")
                .execute(&pool)
                .await;
        assert!(blank.is_err());

        let orphan =
            sqlx::query("INSERT INTO messages (chat_id, sender, content) VALUES ('nope', 'user', 'x')")
                .execute(&pool)
                .await;
        assert!(orphan.is_err(), "foreign keys must be enforced");
    }

    #[tokio::test]
    async fn test_trigger_touches_chat() {
        let pool = setup_test_database().await.unwrap();
        sqlx::query(
            "INSERT INTO chats (id, title, created_at, last_modified_at) \
             VALUES ('c1', 't', '2024-01-01 00:00:00.000', '2024-01-01 00:00:00.000')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO messages (chat_id, sender, content, created_at) \
             VALUES ('c1', 'user', 'hi', '2024-01-02 00:00:00.000')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let row = sqlx::query("SELECT last_modified_at FROM chats WHERE id = 'c1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        let touched: String = row.get("last_modified_at");
        assert_eq!(touched, "2024-01-02 00:00:00.000");
    }
}
