//! A loaded model served by a llama-server child.

use async_trait::async_trait;
use ggchat_core::{Completion, CompletionRequest, EngineError, InferenceEngine};
use tokio::process::Child;
use tracing::{debug, info};

use super::wire::{CompletionBody, CompletionReply};
use crate::error::RuntimeError;
use crate::process::shutdown_child;

/// Longest error body quoted back to callers.
const MAX_ERROR_BODY: usize = 200;

/// Engine handle talking to llama-server over loopback HTTP.
pub struct LlamaServerEngine {
    client: reqwest::Client,
    base_url: String,
    child: Option<Child>,
}

impl LlamaServerEngine {
    /// Wrap a server already answering at `base_url`.
    ///
    /// `child` is the owning process, if any; it is shut down on release.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, child: Option<Child>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            child,
        }
    }

    async fn complete(&mut self, request: &CompletionRequest) -> Result<Completion, RuntimeError> {
        if let Some(child) = self.child.as_mut() {
            if let Ok(Some(status)) = child.try_wait() {
                return Err(RuntimeError::Exited {
                    status: status.to_string(),
                });
            }
        }

        let url = format!("{}/completion", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&CompletionBody::from(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RuntimeError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let reply: CompletionReply = response.json().await?;
        debug!(
            prompt_tokens = reply.tokens_evaluated,
            completion_tokens = reply.tokens_predicted,
            "Completion finished"
        );
        Ok(reply.into())
    }
}

#[async_trait]
impl InferenceEngine for LlamaServerEngine {
    async fn generate(&mut self, request: &CompletionRequest) -> Result<Completion, EngineError> {
        match self.complete(request).await {
            Ok(completion) => Ok(completion),
            // A transport error is often the child crashing mid-request
            Err(e) if !self.is_alive() => Err(EngineError::Dead(e.to_string())),
            Err(e) => Err(e.into_generate()),
        }
    }

    fn is_alive(&mut self) -> bool {
        self.child
            .as_mut()
            .is_none_or(|child| matches!(child.try_wait(), Ok(None)))
    }

    async fn release(&mut self) -> Result<(), EngineError> {
        let Some(child) = self.child.take() else {
            return Ok(());
        };
        let pid = child.id();
        let status = shutdown_child(child)
            .await
            .map_err(|e| EngineError::from(RuntimeError::Shutdown(e)))?;
        info!(?pid, %status, "llama-server stopped");
        Ok(())
    }
}
