//! Query orchestrator - one chat turn from question to persisted answer.
//!
//! Steps run in a fixed order: validate, ensure the model, persist the user
//! turn, assemble the prompt, generate, persist the assistant turn. Any
//! failure before the user turn is persisted leaves no trace. A generation
//! failure leaves the user turn in history without a reply. A failure to
//! persist the reply is logged and the reply is still returned.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::conversation::ConversationStore;
use super::prompt::PromptAssembler;
use super::runtime_manager::ModelRuntimeManager;
use super::settings_service::GenerationSettingsService;
use crate::domain::{GenerationParams, GenerationSettings, Sender};
use crate::ports::CoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub chat_id: String,
    pub model: String,
    pub text: String,
    /// Per-query overrides of the global generation settings.
    #[serde(default, flatten)]
    pub params: GenerationParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    pub tokens_used: u32,
    pub settings_used: GenerationSettings,
}

pub struct QueryOrchestrator {
    conversations: Arc<ConversationStore>,
    runtime: Arc<ModelRuntimeManager>,
    settings: Arc<GenerationSettingsService>,
    prompts: PromptAssembler,
}

impl QueryOrchestrator {
    pub fn new(
        conversations: Arc<ConversationStore>,
        runtime: Arc<ModelRuntimeManager>,
        settings: Arc<GenerationSettingsService>,
        prompts: PromptAssembler,
    ) -> Self {
        Self {
            conversations,
            runtime,
            settings,
            prompts,
        }
    }

    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse, CoreError> {
        let started = Instant::now();
        if request.text.trim().is_empty() {
            return Err(CoreError::InvalidRequest(
                "query text must not be empty".to_string(),
            ));
        }
        let model = request.model.trim();
        if model.is_empty() {
            return Err(CoreError::InvalidRequest(
                "model must not be empty".to_string(),
            ));
        }
        let settings = self.settings.effective(&request.params).await?;
        let chat_id = request.chat_id.as_str();

        // Unknown chats fail before any model work.
        self.conversations.get_chat(chat_id).await?;

        self.runtime.ensure_loaded(model).await?;

        self.conversations
            .append_message(chat_id, Sender::User, &request.text)
            .await
            .inspect_err(|e| {
                error!(
                    chat_id = %chat_id,
                    model = %model,
                    error = %e,
                    "Failed to persist user turn"
                );
            })?;

        let history = self.conversations.list_messages(chat_id).await?;
        let prompt = self.prompts.build(&history);
        debug!(
            chat_id = %chat_id,
            turns = history.len(),
            prompt_chars = prompt.len(),
            "Prompt assembled"
        );

        let generated = self
            .runtime
            .generate_with(model, &prompt, &settings)
            .await
            .inspect_err(|e| {
                error!(chat_id = %chat_id, model = %model, error = %e, "Generation failed");
            })?;

        if generated.text.is_empty() {
            debug!(chat_id = %chat_id, model = %model, "Empty completion, nothing to persist");
        } else if let Err(e) = self
            .conversations
            .append_message(chat_id, Sender::Assistant, &generated.text)
            .await
        {
            error!(
                chat_id = %chat_id,
                model = %model,
                error = %e,
                "Failed to persist assistant turn, returning response anyway"
            );
        }

        info!(
            chat_id = %chat_id,
            model = %model,
            tokens = generated.usage.total(),
            elapsed_ms = started.elapsed().as_millis(),
            "Query answered"
        );
        Ok(QueryResponse {
            response: generated.text,
            tokens_used: generated.usage.total(),
            settings_used: settings,
        })
    }
}
