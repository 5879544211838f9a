//! The query endpoint.

use axum::Json;
use axum::extract::State;
use ggchat_core::{QueryRequest, QueryResponse};

use crate::error::HttpError;
use crate::state::AppState;

/// Answer a user message within a chat.
/// POST /api/query
pub async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, HttpError> {
    Ok(Json(state.queries().query(req).await?))
}
