//! Repository implementations using `SQLite`.
//!
//! These implementations encapsulate all SQL queries and database access.
//! The `SqlitePool` is confined to this module and never exposed through
//! the port trait signatures.

mod sqlite_chat_history_repository;
mod sqlite_settings_repository;

pub use sqlite_chat_history_repository::SqliteChatHistoryRepository;
pub use sqlite_settings_repository::SqliteSettingsRepository;
