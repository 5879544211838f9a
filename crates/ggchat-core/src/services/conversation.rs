//! Conversation store - thin orchestrator over the chat history port.
//!
//! Validation lives here; persistence rules (title rewrite, timestamp bump,
//! cascade delete) live in the repository.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::domain::chat::{CUSTOM_TITLE_MAX_CHARS, Chat, Message, NewChat, NewMessage, Sender};
use crate::ports::{ChatHistoryRepository, CoreError};

pub struct ConversationStore {
    repo: Arc<dyn ChatHistoryRepository>,
}

impl ConversationStore {
    pub fn new(repo: Arc<dyn ChatHistoryRepository>) -> Self {
        Self { repo }
    }

    /// Create a chat.
    ///
    /// Without a custom title the chat gets a timestamped placeholder that the
    /// first user message later replaces.
    pub async fn create_chat(
        &self,
        model_used: Option<String>,
        title: Option<String>,
    ) -> Result<Chat, CoreError> {
        let mut new_chat = NewChat::with_placeholder(
            model_used.filter(|m| !m.trim().is_empty()),
            Utc::now(),
        );
        if let Some(title) = title {
            new_chat.title = validate_custom_title(&title)?;
        }

        let chat = self.repo.create_chat(new_chat).await?;
        debug!(chat_id = %chat.id, title = %chat.title, "Chat created");
        Ok(chat)
    }

    pub async fn get_chat(&self, id: &str) -> Result<Chat, CoreError> {
        self.repo
            .get_chat(id)
            .await?
            .ok_or_else(|| CoreError::ChatNotFound(id.to_string()))
    }

    /// All chats, most recently modified first.
    pub async fn list_chats(&self) -> Result<Vec<Chat>, CoreError> {
        Ok(self.repo.list_chats().await?)
    }

    pub async fn append_message(
        &self,
        chat_id: &str,
        sender: Sender,
        content: &str,
    ) -> Result<Message, CoreError> {
        if content.trim().is_empty() {
            return Err(CoreError::InvalidRequest(
                "message content must not be empty".to_string(),
            ));
        }
        let message = self
            .repo
            .append_message(NewMessage {
                chat_id: chat_id.to_string(),
                sender,
                content: content.to_string(),
            })
            .await?;
        Ok(message)
    }

    /// Messages in insertion order. Unknown chats are an error, not an empty list.
    pub async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>, CoreError> {
        Ok(self.repo.list_messages(chat_id).await?)
    }

    /// Delete a chat and its messages.
    ///
    /// Returns `false` when no chat with `id` existed.
    pub async fn delete_chat(&self, id: &str) -> Result<bool, CoreError> {
        let deleted = self.repo.delete_chat(id).await?;
        if deleted {
            debug!(chat_id = %id, "Chat deleted");
        }
        Ok(deleted)
    }
}

fn validate_custom_title(title: &str) -> Result<String, CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidRequest(
            "title must not be blank".to_string(),
        ));
    }
    if trimmed.chars().count() > CUSTOM_TITLE_MAX_CHARS {
        return Err(CoreError::InvalidRequest(format!(
            "title must be at most {CUSTOM_TITLE_MAX_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::is_placeholder_title;
    use crate::testing::InMemoryChatHistory;

    fn store() -> ConversationStore {
        ConversationStore::new(Arc::new(InMemoryChatHistory::new()))
    }

    #[tokio::test]
    async fn test_new_chat_gets_placeholder_then_derived_title() {
        let store = store();
        let chat = store
            .create_chat(Some("Mistral-7B-Instruct".into()), None)
            .await
            .unwrap();
        assert!(is_placeholder_title(&chat.title));
        assert_eq!(chat.model_used.as_deref(), Some("Mistral-7B-Instruct"));

        store
            .append_message(&chat.id, Sender::User, "How do  I\nbake bread?")
            .await
            .unwrap();
        store
            .append_message(&chat.id, Sender::User, "Second question")
            .await
            .unwrap();

        let chat = store.get_chat(&chat.id).await.unwrap();
        assert_eq!(chat.title, "How do I bake bread?");
    }

    #[tokio::test]
    async fn test_custom_title_is_kept() {
        let store = store();
        let chat = store
            .create_chat(None, Some("  Bread notes ".into()))
            .await
            .unwrap();
        assert_eq!(chat.title, "Bread notes");

        store
            .append_message(&chat.id, Sender::User, "hello")
            .await
            .unwrap();
        assert_eq!(store.get_chat(&chat.id).await.unwrap().title, "Bread notes");
    }

    #[tokio::test]
    async fn test_custom_title_validation() {
        let store = store();
        let err = store.create_chat(None, Some("   ".into())).await.unwrap_err();
        assert!(err.is_validation());

        let long = "x".repeat(CUSTOM_TITLE_MAX_CHARS + 1);
        let err = store.create_chat(None, Some(long)).await.unwrap_err();
        assert!(err.is_validation());

        let exact = "x".repeat(CUSTOM_TITLE_MAX_CHARS);
        assert!(store.create_chat(None, Some(exact)).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let store = store();
        let chat = store.create_chat(None, None).await.unwrap();
        let err = store
            .append_message(&chat.id, Sender::User, " \n\t")
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(store.list_messages(&chat.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_chat_is_not_found() {
        let store = store();
        assert!(matches!(
            store.get_chat("missing").await,
            Err(CoreError::ChatNotFound(_))
        ));
        assert!(matches!(
            store.list_messages("missing").await,
            Err(CoreError::ChatNotFound(_))
        ));
        assert!(matches!(
            store.append_message("missing", Sender::User, "hi").await,
            Err(CoreError::ChatNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deleting_unknown_chat_reports_false() {
        let store = store();
        assert!(!store.delete_chat("never-created").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_chat_and_messages() {
        let store = store();
        let chat = store.create_chat(None, None).await.unwrap();
        store
            .append_message(&chat.id, Sender::User, "hi")
            .await
            .unwrap();

        assert!(store.delete_chat(&chat.id).await.unwrap());
        assert!(!store.delete_chat(&chat.id).await.unwrap());
        assert!(store.list_chats().await.unwrap().is_empty());
        assert!(matches!(
            store.list_messages(&chat.id).await,
            Err(CoreError::ChatNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_chats_orders_by_last_activity() {
        let store = store();
        let older = store.create_chat(None, None).await.unwrap();
        let newer = store.create_chat(None, None).await.unwrap();

        store
            .append_message(&older.id, Sender::User, "bump")
            .await
            .unwrap();

        let ids: Vec<String> = store
            .list_chats()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![older.id, newer.id]);
    }
}
