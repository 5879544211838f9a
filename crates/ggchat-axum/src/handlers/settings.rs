//! Generation settings handlers.

use axum::Json;
use axum::extract::State;
use ggchat_core::{GenerationParams, GenerationSettings};

use crate::error::HttpError;
use crate::state::AppState;

/// Get the current generation settings.
/// GET /api/settings/generation
pub async fn get(State(state): State<AppState>) -> Json<GenerationSettings> {
    Json(state.settings().current().await)
}

/// Update generation settings. Omitted fields keep their current value.
/// PUT /api/settings/generation
pub async fn update(
    State(state): State<AppState>,
    Json(params): Json<GenerationParams>,
) -> Result<Json<GenerationSettings>, HttpError> {
    Ok(Json(state.settings().update(params).await?))
}
