//! HTTP adapter for ggchat.
//!
//! Exposes the core services as a JSON API under `/api`, plus `/health`.
//! [`bootstrap`] wires the `SQLite`, Hugging Face, download and llama-server
//! adapters into an [`ggchat_core::AppCore`].

use dotenvy as _; // Used by main.rs binary
use tracing_subscriber as _; // Used by main.rs binary

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use bootstrap::{CorsConfig, ServerConfig, bootstrap, start_server};
pub use error::HttpError;
pub use routes::create_router;
pub use state::AppState;
