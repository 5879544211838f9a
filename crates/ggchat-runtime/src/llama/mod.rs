//! llama-server backed inference engine.
//!
//! Each constructed engine owns one `llama-server` child bound to a private
//! loopback port. Releasing the engine shuts the child down; dropping it
//! without a release kills the child.

mod engine;
mod factory;
mod wire;

use std::path::PathBuf;
use std::time::Duration;

pub use engine::LlamaServerEngine;
pub use factory::{LlamaServerFactory, server_args};

/// Settings for spawning and talking to llama-server.
#[derive(Debug, Clone)]
pub struct LlamaServerConfig {
    /// Binary to execute. A bare name is looked up on `PATH`.
    pub binary: PathBuf,
    /// How long to wait for `/health` after spawning.
    pub startup_timeout: Duration,
    pub health_poll_interval: Duration,
}

impl Default for LlamaServerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("llama-server"),
            startup_timeout: Duration::from_secs(300),
            health_poll_interval: Duration::from_millis(250),
        }
    }
}

impl LlamaServerConfig {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }
}
