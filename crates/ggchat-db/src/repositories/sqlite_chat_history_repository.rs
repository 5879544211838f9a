//! `SQLite` implementation of the `ChatHistoryRepository` trait.

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeDelta, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;
use tracing::debug;

use ggchat_core::{
    domain::chat::{
        Chat, Message, NewChat, NewMessage, PLACEHOLDER_TITLE_GLOB, Sender, derive_title,
    },
    ports::chat_history::{ChatHistoryError, ChatHistoryRepository, validate_sender},
};

/// Stored timestamp layout. Fixed width, so text order is time order.
const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// `SQLite` implementation of the `ChatHistoryRepository` trait.
///
/// Mutations are serialized through a store-wide lock and each runs in one
/// transaction, so the first-message title rewrite and the activity bump
/// can never interleave with another append.
pub struct SqliteChatHistoryRepository {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl SqliteChatHistoryRepository {
    /// Create a new `SQLite` chat history repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }
}

fn db_err(e: sqlx::Error) -> ChatHistoryError {
    ChatHistoryError::Database(e.to_string())
}

fn now_stamp() -> String {
    Utc::now().naive_utc().format(STAMP_FORMAT).to_string()
}

/// A stamp strictly after `previous`, normally the current time.
///
/// Keeps per-chat message timestamps increasing even when the wall clock
/// stalls or steps back.
fn next_stamp(previous: &str) -> String {
    let now = Utc::now().naive_utc();
    match NaiveDateTime::parse_from_str(previous, "%Y-%m-%d %H:%M:%S%.f") {
        Ok(prev) if prev >= now => (prev + TimeDelta::microseconds(1))
            .format(STAMP_FORMAT)
            .to_string(),
        _ => now.format(STAMP_FORMAT).to_string(),
    }
}

fn chat_from_row(row: &SqliteRow) -> Chat {
    Chat {
        id: row.get("id"),
        title: row.get("title"),
        model_used: row.get("model_used"),
        created_at: row.get("created_at"),
        last_modified_at: row.get("last_modified_at"),
    }
}

fn message_from_row(row: &SqliteRow) -> Result<Message, ChatHistoryError> {
    let sender: String = row.get("sender");
    Ok(Message {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        sender: validate_sender(&sender)?,
        content: row.get("content"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl ChatHistoryRepository for SqliteChatHistoryRepository {
    async fn create_chat(&self, chat: NewChat) -> Result<Chat, ChatHistoryError> {
        let _guard = self.write_lock.lock().await;
        let stamp = now_stamp();

        sqlx::query(
            "INSERT INTO chats (id, title, model_used, created_at, last_modified_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&chat.id)
        .bind(&chat.title)
        .bind(&chat.model_used)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Chat {
            id: chat.id,
            title: chat.title,
            model_used: chat.model_used,
            created_at: stamp.clone(),
            last_modified_at: stamp,
        })
    }

    async fn get_chat(&self, id: &str) -> Result<Option<Chat>, ChatHistoryError> {
        let row = sqlx::query(
            "SELECT id, title, model_used, created_at, last_modified_at FROM chats WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.as_ref().map(chat_from_row))
    }

    async fn list_chats(&self) -> Result<Vec<Chat>, ChatHistoryError> {
        let rows = sqlx::query(
            "SELECT id, title, model_used, created_at, last_modified_at \
             FROM chats \
             ORDER BY last_modified_at DESC, created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.iter().map(chat_from_row).collect())
    }

    async fn append_message(&self, msg: NewMessage) -> Result<Message, ChatHistoryError> {
        if msg.content.trim().is_empty() {
            return Err(ChatHistoryError::EmptyContent);
        }

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let last_modified: String =
            sqlx::query("SELECT last_modified_at FROM chats WHERE id = ?")
                .bind(&msg.chat_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?
                .ok_or_else(|| ChatHistoryError::ChatNotFound(msg.chat_id.clone()))?
                .get("last_modified_at");

        let stamp = next_stamp(&last_modified);
        let result = sqlx::query(
            "INSERT INTO messages (chat_id, sender, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&msg.chat_id)
        .bind(msg.sender.as_str())
        .bind(&msg.content)
        .bind(&stamp)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        let id = result.last_insert_rowid();

        if msg.sender == Sender::User {
            let renamed = sqlx::query(
                "UPDATE chats SET title = ? \
                 WHERE id = ? AND title GLOB ? \
                 AND NOT EXISTS ( \
                     SELECT 1 FROM messages WHERE chat_id = ? AND sender = 'user' AND id <> ? \
                 )",
            )
            .bind(derive_title(&msg.content))
            .bind(&msg.chat_id)
            .bind(PLACEHOLDER_TITLE_GLOB)
            .bind(&msg.chat_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
            if renamed.rows_affected() > 0 {
                debug!(chat_id = %msg.chat_id, "Chat title derived from first message");
            }
        }

        tx.commit().await.map_err(db_err)?;

        Ok(Message {
            id,
            chat_id: msg.chat_id,
            sender: msg.sender,
            content: msg.content,
            created_at: stamp,
        })
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>, ChatHistoryError> {
        let exists = sqlx::query("SELECT 1 FROM chats WHERE id = ?")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        if exists.is_none() {
            return Err(ChatHistoryError::ChatNotFound(chat_id.to_string()));
        }

        let rows = sqlx::query(
            "SELECT id, chat_id, sender, content, created_at \
             FROM messages \
             WHERE chat_id = ? \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(message_from_row).collect()
    }

    async fn delete_chat(&self, id: &str) -> Result<bool, ChatHistoryError> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;
    use ggchat_core::domain::chat::placeholder_title;

    async fn repo() -> SqliteChatHistoryRepository {
        SqliteChatHistoryRepository::new(setup_test_database().await.unwrap())
    }

    fn new_chat(id: &str, title: &str) -> NewChat {
        NewChat {
            id: id.to_string(),
            title: title.to_string(),
            model_used: Some("Mistral-7B-Instruct".to_string()),
        }
    }

    fn user(chat_id: &str, content: &str) -> NewMessage {
        NewMessage {
            chat_id: chat_id.to_string(),
            sender: Sender::User,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_next_stamp_is_strictly_later() {
        let future = "2999-01-01 00:00:00.000000";
        assert_eq!(next_stamp(future), "2999-01-01 00:00:00.000001");

        let past = "2000-01-01 00:00:00.000";
        assert!(next_stamp(past).as_str() > past);
        assert!(next_stamp("garbage").starts_with("20"));
    }

    #[tokio::test]
    async fn test_create_and_get_chat() {
        let repo = repo().await;
        let created = repo.create_chat(new_chat("c1", "Notes")).await.unwrap();
        assert_eq!(created.created_at, created.last_modified_at);

        let fetched = repo.get_chat("c1").await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(repo.get_chat("c2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_placeholder_title_rewritten_once() {
        let repo = repo().await;
        let placeholder = placeholder_title(Utc::now());
        repo.create_chat(new_chat("c1", &placeholder)).await.unwrap();

        repo.append_message(NewMessage {
            chat_id: "c1".into(),
            sender: Sender::Assistant,
            content: "Welcome!".into(),
        })
        .await
        .unwrap();
        assert_eq!(repo.get_chat("c1").await.unwrap().unwrap().title, placeholder);

        repo.append_message(user("c1", "Explain   borrow checking\nplease"))
            .await
            .unwrap();
        repo.append_message(user("c1", "Something else")).await.unwrap();

        let chat = repo.get_chat("c1").await.unwrap().unwrap();
        assert_eq!(chat.title, "Explain borrow checking please");
    }

    #[tokio::test]
    async fn test_custom_title_survives_first_message() {
        let repo = repo().await;
        repo.create_chat(new_chat("c1", "My title")).await.unwrap();
        repo.append_message(user("c1", "hello")).await.unwrap();
        assert_eq!(repo.get_chat("c1").await.unwrap().unwrap().title, "My title");
    }

    #[tokio::test]
    async fn test_append_to_missing_chat_fails() {
        let repo = repo().await;
        let err = repo.append_message(user("missing", "hi")).await.unwrap_err();
        assert!(matches!(err, ChatHistoryError::ChatNotFound(_)));

        let err = repo.list_messages("missing").await.unwrap_err();
        assert!(matches!(err, ChatHistoryError::ChatNotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let repo = repo().await;
        repo.create_chat(new_chat("c1", "t")).await.unwrap();
        let err = repo.append_message(user("c1", "  ")).await.unwrap_err();
        assert!(matches!(err, ChatHistoryError::EmptyContent));
    }

    #[tokio::test]
    async fn test_append_advances_last_modified() {
        let repo = repo().await;
        let chat = repo.create_chat(new_chat("c1", "t")).await.unwrap();
        let msg = repo.append_message(user("c1", "hi")).await.unwrap();

        let after = repo.get_chat("c1").await.unwrap().unwrap();
        assert_eq!(after.last_modified_at, msg.created_at);
        assert!(after.last_modified_at > chat.created_at);
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let repo = repo().await;
        repo.create_chat(new_chat("c1", "t")).await.unwrap();
        assert!(repo.delete_chat("c1").await.unwrap());
        assert!(!repo.delete_chat("c1").await.unwrap());
    }
}
