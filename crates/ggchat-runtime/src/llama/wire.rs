//! JSON bodies of llama-server's `/completion` endpoint.

use ggchat_core::domain::TokenUsage;
use ggchat_core::{Completion, CompletionRequest};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct CompletionBody<'a> {
    pub prompt: &'a str,
    pub n_predict: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub stop: &'a [String],
    pub repeat_penalty: f32,
    pub cache_prompt: bool,
    pub stream: bool,
}

impl<'a> From<&'a CompletionRequest> for CompletionBody<'a> {
    fn from(request: &'a CompletionRequest) -> Self {
        Self {
            prompt: &request.prompt,
            n_predict: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            stop: &request.stop,
            repeat_penalty: request.repeat_penalty,
            cache_prompt: true,
            stream: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionReply {
    #[serde(default)]
    pub content: String,
    pub tokens_predicted: Option<u32>,
    pub tokens_evaluated: Option<u32>,
}

impl From<CompletionReply> for Completion {
    fn from(reply: CompletionReply) -> Self {
        let usage = match (reply.tokens_evaluated, reply.tokens_predicted) {
            (None, None) => None,
            (prompt, completion) => Some(TokenUsage {
                prompt_tokens: prompt.unwrap_or(0),
                completion_tokens: completion.unwrap_or(0),
            }),
        };
        Self {
            text: reply.content,
            usage,
        }
    }
}
