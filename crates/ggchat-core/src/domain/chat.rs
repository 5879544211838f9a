//! Chat domain types.
//!
//! A chat is a persistent conversation thread identified by an opaque id.
//! Messages are append-only and ordered by insertion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix shared by every placeholder title.
pub const PLACEHOLDER_TITLE_PREFIX: &str = "New chat ";

/// `SQLite` GLOB pattern matching a placeholder title.
///
/// Kept in lockstep with [`is_placeholder_title`].
pub const PLACEHOLDER_TITLE_GLOB: &str = "New chat [0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9] [0-9][0-9]:[0-9][0-9]:[0-9][0-9]";

/// Maximum number of characters taken from the first user message.
pub const DERIVED_TITLE_MAX_CHARS: usize = 50;

/// Maximum length of a caller-supplied chat title.
pub const CUSTOM_TITLE_MAX_CHARS: usize = 200;

/// A persistent conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub model_used: Option<String>,
    pub created_at: String,
    pub last_modified_at: String,
}

/// A single message within a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub chat_id: String,
    pub sender: Sender,
    pub content: String,
    pub created_at: String,
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    /// Parse a sender from its stored representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }

    /// Stored representation of the sender.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Role label used when rendering prompts.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Data for creating a new chat.
#[derive(Debug, Clone)]
pub struct NewChat {
    pub id: String,
    pub title: String,
    pub model_used: Option<String>,
}

impl NewChat {
    /// A chat with a fresh v4 id and a placeholder title stamped with `now`.
    pub fn with_placeholder(model_used: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: placeholder_title(now),
            model_used,
        }
    }
}

/// Data for appending a message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: String,
    pub sender: Sender,
    pub content: String,
}

/// Placeholder title for a chat created at `now`.
pub fn placeholder_title(now: DateTime<Utc>) -> String {
    format!("{PLACEHOLDER_TITLE_PREFIX}{}", now.format("%Y-%m-%d %H:%M:%S"))
}

/// Whether `title` still has the placeholder shape.
pub fn is_placeholder_title(title: &str) -> bool {
    let Some(stamp) = title.strip_prefix(PLACEHOLDER_TITLE_PREFIX) else {
        return false;
    };
    let bytes = stamp.as_bytes();
    if bytes.len() != 19 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        10 => *b == b' ',
        13 | 16 => *b == b':',
        _ => b.is_ascii_digit(),
    })
}

/// Title derived from the first user message.
///
/// Whitespace runs collapse to single spaces and the result is cut on a
/// character boundary at [`DERIVED_TITLE_MAX_CHARS`].
pub fn derive_title(content: &str) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(DERIVED_TITLE_MAX_CHARS).collect();
    truncated.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sender_round_trips_through_str() {
        assert_eq!(Sender::parse("user"), Some(Sender::User));
        assert_eq!(Sender::parse("assistant"), Some(Sender::Assistant));
        assert_eq!(Sender::parse("system"), None);
        assert_eq!(Sender::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_placeholder_title_matches_its_own_pattern() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let title = placeholder_title(now);
        assert_eq!(title, "New chat 2024-03-09 07:05:01");
        assert!(is_placeholder_title(&title));
    }

    #[test]
    fn test_custom_titles_are_not_placeholders() {
        assert!(!is_placeholder_title("New chat"));
        assert!(!is_placeholder_title("New chat about rust"));
        assert!(!is_placeholder_title("New chat 2024-03-09 07:05"));
        assert!(!is_placeholder_title("new chat 2024-03-09 07:05:01"));
    }

    #[test]
    fn test_derive_title_collapses_whitespace_and_bounds_length() {
        assert_eq!(
            derive_title("  Hello world,\n how are   you today?  "),
            "Hello world, how are you today?"
        );

        let long = "word ".repeat(40);
        let title = derive_title(&long);
        assert!(title.chars().count() <= DERIVED_TITLE_MAX_CHARS);
        assert!(long.starts_with(&title));
    }

    #[test]
    fn test_derive_title_respects_char_boundaries() {
        let text = "é".repeat(80);
        let title = derive_title(&text);
        assert_eq!(title.chars().count(), DERIVED_TITLE_MAX_CHARS);
    }

    #[test]
    fn test_new_chat_gets_unique_ids() {
        let now = Utc::now();
        let a = NewChat::with_placeholder(None, now);
        let b = NewChat::with_placeholder(Some("Mistral-7B-Instruct".into()), now);
        assert_ne!(a.id, b.id);
        assert!(is_placeholder_title(&a.title));
        assert_eq!(b.model_used.as_deref(), Some("Mistral-7B-Instruct"));
    }
}
