//! Process runtime and host probing for ggchat.
//!
//! - [`LlamaServerFactory`] implements [`ggchat_core::EngineFactory`] by
//!   spawning one `llama-server` child per loaded model and talking to it
//!   over loopback HTTP.
//! - [`DefaultAcceleratorProbe`] implements [`ggchat_core::AcceleratorProbe`].

#![deny(unsafe_code)]

mod accelerator;
mod error;
mod health;
pub mod llama;
pub mod process;

pub use accelerator::DefaultAcceleratorProbe;
pub use error::RuntimeError;
pub use health::wait_for_http_health;
pub use llama::{LlamaServerConfig, LlamaServerEngine, LlamaServerFactory};
