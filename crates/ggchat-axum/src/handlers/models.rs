//! Model catalog and runtime handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use ggchat_core::{ModelDescriptor, RuntimeStatus};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::HttpError;
use crate::state::AppState;

/// Query parameters for the model listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListModelsQuery {
    /// Bypass the cached catalog.
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct InstallResponse {
    pub name: String,
    pub installed: bool,
}

#[derive(Debug, Serialize)]
pub struct LoadResponse {
    pub loaded_model: String,
}

/// List catalog models.
/// GET /api/models
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListModelsQuery>,
) -> Json<Vec<ModelDescriptor>> {
    Json(state.catalog().list_models(query.refresh).await)
}

/// Download a model's artifact if it is not on disk yet.
/// POST /api/models/{name}/install
pub async fn install(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<InstallResponse>, HttpError> {
    state.catalog().ensure_downloaded(&name).await?;
    info!(model = %name, "Model installed");
    Ok(Json(InstallResponse {
        name,
        installed: true,
    }))
}

/// Make `name` the loaded model.
/// POST /api/models/{name}/load
pub async fn load(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<LoadResponse>, HttpError> {
    state.runtime().ensure_loaded(&name).await?;
    Ok(Json(LoadResponse { loaded_model: name }))
}

/// Report the loaded model and its engine configuration.
/// GET /api/model/status
pub async fn status(State(state): State<AppState>) -> Json<RuntimeStatus> {
    Json(state.runtime().status().await)
}
