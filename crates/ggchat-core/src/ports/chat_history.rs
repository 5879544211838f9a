//! Chat history repository port definition.
//!
//! This port defines the interface for persisting and retrieving chats and
//! their messages.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::chat::{Chat, Message, NewChat, NewMessage, Sender};

/// Errors that can occur in chat history operations.
#[derive(Debug, Error)]
pub enum ChatHistoryError {
    #[error("Chat not found: {0}")]
    ChatNotFound(String),

    #[error("Invalid message sender: {0}")]
    InvalidSender(String),

    #[error("Message content must not be empty")]
    EmptyContent,

    #[error("Database error: {0}")]
    Database(String),
}

/// Port for chat history persistence operations.
///
/// Implementations must serialize mutations: the title rewrite on the first
/// user message and the `last_modified_at` bump happen atomically with the
/// message insert.
#[async_trait]
pub trait ChatHistoryRepository: Send + Sync {
    /// Persist a new chat and return it with store-assigned timestamps.
    async fn create_chat(&self, chat: NewChat) -> Result<Chat, ChatHistoryError>;

    /// Get a chat by id.
    async fn get_chat(&self, id: &str) -> Result<Option<Chat>, ChatHistoryError>;

    /// List all chats, most recently modified first.
    async fn list_chats(&self) -> Result<Vec<Chat>, ChatHistoryError>;

    /// Append a message.
    ///
    /// Fails with [`ChatHistoryError::ChatNotFound`] if the chat is missing.
    /// The first user message replaces a placeholder title.
    async fn append_message(&self, msg: NewMessage) -> Result<Message, ChatHistoryError>;

    /// All messages of a chat in insertion order.
    ///
    /// Fails with [`ChatHistoryError::ChatNotFound`] if the chat is missing,
    /// so an existing chat without messages yields an empty vector.
    async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>, ChatHistoryError>;

    /// Delete a chat and its messages. Returns `false` if it did not exist.
    async fn delete_chat(&self, id: &str) -> Result<bool, ChatHistoryError>;
}

/// Validate a stored sender string.
pub fn validate_sender(sender: &str) -> Result<Sender, ChatHistoryError> {
    Sender::parse(sender).ok_or_else(|| ChatHistoryError::InvalidSender(sender.to_string()))
}
