//! Generation settings and results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for `max_tokens`.
pub const MAX_TOKENS_LIMIT: u32 = 8192;

/// Stop sequences applied to every completion.
///
/// They cut the output at the next section marker or at a role-prefixed
/// continuation where the model starts writing the other side's turn.
pub const STOP_SEQUENCES: &[&str] = &["###", "<|endoftext|>", "\nUser:", "\nAssistant:"];

/// Repeat penalty passed to the engine.
pub const REPEAT_PENALTY: f32 = 1.2;

/// Errors produced while validating generation settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("max_tokens must be between 1 and 8192, got {0}")]
    MaxTokensOutOfRange(u32),

    #[error("temperature must be between 0 and 2, got {0}")]
    TemperatureOutOfRange(f32),

    #[error("top_p must be between 0 and 1, got {0}")]
    TopPOutOfRange(f32),
}

/// Process-wide sampling settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

impl GenerationSettings {
    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(1..=MAX_TOKENS_LIMIT).contains(&self.max_tokens) {
            return Err(SettingsError::MaxTokensOutOfRange(self.max_tokens));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(SettingsError::TemperatureOutOfRange(self.temperature));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(SettingsError::TopPOutOfRange(self.top_p));
        }
        Ok(())
    }

    /// Settings with any field present in `overrides` replaced.
    #[must_use]
    pub fn with_overrides(&self, overrides: &GenerationParams) -> Self {
        Self {
            max_tokens: overrides.max_tokens.unwrap_or(self.max_tokens),
            temperature: overrides.temperature.unwrap_or(self.temperature),
            top_p: overrides.top_p.unwrap_or(self.top_p),
        }
    }
}

/// Partial settings, used for per-query overrides and global updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

impl GenerationParams {
    pub const fn is_empty(&self) -> bool {
        self.max_tokens.is_none() && self.temperature.is_none() && self.top_p.is_none()
    }
}

/// Token accounting for one completion. Zero when the engine did not report it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub const fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Trimmed completion text plus usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedText {
    pub text: String,
    pub usage: TokenUsage,
}

/// Cut `text` at the earliest occurrence of any stop sequence.
pub fn truncate_at_stop<'a>(text: &'a str, stops: &[&str]) -> &'a str {
    let cut = stops
        .iter()
        .filter_map(|stop| text.find(stop))
        .min()
        .unwrap_or(text.len());
    &text[..cut]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = GenerationSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.max_tokens, 512);
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let base = GenerationSettings::default();

        let zero_tokens = GenerationSettings {
            max_tokens: 0,
            ..base
        };
        assert_eq!(
            zero_tokens.validate(),
            Err(SettingsError::MaxTokensOutOfRange(0))
        );

        let too_many = GenerationSettings {
            max_tokens: MAX_TOKENS_LIMIT + 1,
            ..base
        };
        assert!(too_many.validate().is_err());

        let hot = GenerationSettings {
            temperature: 2.5,
            ..base
        };
        assert!(matches!(
            hot.validate(),
            Err(SettingsError::TemperatureOutOfRange(_))
        ));

        let nan_top_p = GenerationSettings {
            top_p: f32::NAN,
            ..base
        };
        assert!(matches!(
            nan_top_p.validate(),
            Err(SettingsError::TopPOutOfRange(_))
        ));
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let settings = GenerationSettings {
            max_tokens: MAX_TOKENS_LIMIT,
            temperature: 0.0,
            top_p: 1.0,
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_overrides_replace_only_present_fields() {
        let base = GenerationSettings::default();
        let merged = base.with_overrides(&GenerationParams {
            temperature: Some(0.2),
            ..Default::default()
        });
        assert_eq!(merged.max_tokens, base.max_tokens);
        assert!((merged.temperature - 0.2).abs() < f32::EPSILON);
        assert!((merged.top_p - base.top_p).abs() < f32::EPSILON);
    }

    #[test]
    fn test_truncate_at_earliest_stop() {
        let text = "Four.\nUser: and five?\n### more";
        assert_eq!(truncate_at_stop(text, STOP_SEQUENCES), "Four.");
        assert_eq!(truncate_at_stop("plain", STOP_SEQUENCES), "plain");
    }
}
