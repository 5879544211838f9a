//! Prompt assembly.
//!
//! Renders a chat's recent history as a single completion prompt:
//!
//! ```text
//! ### System: <system prompt>
//! ### Dialog History:
//! User: ...
//! Assistant: ...
//! User: <current question>
//! Assistant:
//! ```
//!
//! Older turns are dropped, not summarized. The trailing `Assistant:` cue
//! and the role prefixes double as stop boundaries for the engine.

use crate::domain::chat::{Message, Sender};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an expert AI assistant. Answer the question based on the context and dialog history.";

pub const DEFAULT_MAX_HISTORY_PAIRS: usize = 5;

/// Build a prompt from `history` (oldest first).
///
/// Keeps the last `max_history_pairs` user turns together with their
/// replies. A final unanswered user turn is always kept and does not count
/// against the limit.
pub fn build_prompt(history: &[Message], system_prompt: &str, max_history_pairs: usize) -> String {
    let (answered, pending) = match history.last() {
        Some(last) if last.sender == Sender::User => {
            (&history[..history.len() - 1], Some(last))
        }
        _ => (history, None),
    };

    let start = window_start(answered, max_history_pairs);

    let mut prompt = format!("### System: {}\n### Dialog History:\n", system_prompt.trim());
    for message in answered[start..].iter().chain(pending) {
        prompt.push_str(message.sender.label());
        prompt.push_str(": ");
        prompt.push_str(message.content.trim());
        prompt.push('\n');
    }
    prompt.push_str(Sender::Assistant.label());
    prompt.push(':');
    prompt
}

/// Index of the first message inside the last `pairs` user turns.
fn window_start(messages: &[Message], pairs: usize) -> usize {
    if pairs == 0 {
        return messages.len();
    }
    let mut seen = 0;
    for (idx, message) in messages.iter().enumerate().rev() {
        if message.sender == Sender::User {
            seen += 1;
            if seen == pairs {
                return idx;
            }
        }
    }
    // Fewer turns than the limit, or leading assistant messages: keep all.
    0
}

/// Prompt builder bound to a system prompt and history limit.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    system_prompt: String,
    max_history_pairs: usize,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT, DEFAULT_MAX_HISTORY_PAIRS)
    }
}

impl PromptAssembler {
    pub fn new(system_prompt: impl Into<String>, max_history_pairs: usize) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            max_history_pairs,
        }
    }

    pub fn build(&self, history: &[Message]) -> String {
        build_prompt(history, &self.system_prompt, self.max_history_pairs)
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub const fn max_history_pairs(&self) -> usize {
        self.max_history_pairs
    }
}
