//! Accelerator introspection port.
//!
//! Implementations probe the host (vendor tools, unified memory) and live in
//! `ggchat-runtime`. Calls may block; the runtime manager runs them on the
//! blocking pool.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcceleratorError {
    #[error("Accelerator detection failed: {0}")]
    Detection(String),
}

pub trait AcceleratorProbe: Send + Sync {
    /// Whether any usable accelerator is present.
    fn is_available(&self) -> bool;

    /// Memory available to the accelerator, in bytes.
    fn total_memory_bytes(&self) -> Result<u64, AcceleratorError>;
}
