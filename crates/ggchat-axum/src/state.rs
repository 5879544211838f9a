//! Application state shared by every handler.

use std::sync::Arc;

use ggchat_core::AppCore;

/// Shared application state; the core owns all mutable state.
pub type AppState = Arc<AppCore>;
