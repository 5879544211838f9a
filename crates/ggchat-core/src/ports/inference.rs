//! Inference engine port.
//!
//! The engine is an opaque capability: construct it for a model file, ask it
//! for completions, release it. Exactly one engine is alive at a time; the
//! runtime manager enforces that, not the implementation.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::TokenUsage;

/// Errors raised by an engine implementation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Loading failed (missing binary, out of memory, corrupt file, ...).
    #[error("Engine construction failed: {0}")]
    Construct(String),

    #[error("Engine generation failed: {0}")]
    Generate(String),

    /// The engine stopped running and cannot serve further requests.
    #[error("Engine is no longer running: {0}")]
    Dead(String),

    #[error("Engine release failed: {0}")]
    Release(String),
}

/// Configuration for constructing an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub model_path: PathBuf,
    pub context_length: u32,
    pub threads: usize,
    /// Layers offloaded to the accelerator; 0 runs on CPU only.
    pub gpu_layers: u32,
}

/// One completion request against a loaded engine.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub stop: Vec<String>,
    pub repeat_penalty: f32,
}

/// Raw engine output. `usage` is absent when the engine does not report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// A loaded model.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Generate a completion. Not reentrant; callers serialize access.
    async fn generate(&mut self, request: &CompletionRequest) -> Result<Completion, EngineError>;

    /// Free the engine's resources. The handle must not be used afterwards.
    async fn release(&mut self) -> Result<(), EngineError>;

    /// Whether the engine can still serve requests.
    fn is_alive(&mut self) -> bool {
        true
    }
}

/// Builds engines for model files.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn construct(
        &self,
        config: &EngineConfig,
    ) -> Result<Box<dyn InferenceEngine>, EngineError>;
}
