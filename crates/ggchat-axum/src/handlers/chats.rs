//! Chat history handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use ggchat_core::{Chat, Message};
use serde::Deserialize;

use crate::error::HttpError;
use crate::state::AppState;

/// Request body for creating a chat.
#[derive(Debug, Default, Deserialize)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// List all chats, most recently modified first.
/// GET /api/chats
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Chat>>, HttpError> {
    Ok(Json(state.conversations().list_chats().await?))
}

/// Create a chat.
/// POST /api/chats
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<Chat>), HttpError> {
    let chat = state
        .conversations()
        .create_chat(req.model_used, req.title)
        .await?;
    Ok((StatusCode::CREATED, Json(chat)))
}

/// Messages of a chat in chronological order.
/// GET /api/chats/{id}/messages
pub async fn messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, HttpError> {
    Ok(Json(state.conversations().list_messages(&id).await?))
}

/// Delete a chat and its messages.
/// DELETE /api/chats/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, HttpError> {
    if state.conversations().delete_chat(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(HttpError::NotFound(format!("Chat not found: {id}")))
    }
}
