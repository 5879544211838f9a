//! Domain types for ggchat.
//!
//! These types represent the core domain model, independent of any
//! infrastructure concerns (database, HTTP, inference runtime).

pub mod chat;
pub mod generation;
pub mod model;
pub mod quantization;

pub use chat::{
    Chat, Message, NewChat, NewMessage, Sender, derive_title, is_placeholder_title,
    placeholder_title,
};
pub use generation::{
    GeneratedText, GenerationParams, GenerationSettings, REPEAT_PENALTY, STOP_SEQUENCES,
    SettingsError, TokenUsage, truncate_at_stop,
};
pub use model::{
    CURATED_MODELS, CuratedModel, Modality, ModelDescriptor, infer_modality,
    parse_parameter_count,
};
pub use quantization::{QUANT_PREFERENCE, select_preferred_artifact};
