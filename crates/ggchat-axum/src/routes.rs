//! Route definitions and router construction.

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::bootstrap::CorsConfig;
use crate::handlers;
use crate::state::AppState;

/// Build CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsConfig::AllowOrigins(origins) => {
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// API routes without the `/api` prefix; the caller applies state and nests.
pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        // Models API
        .route("/models", get(handlers::models::list))
        .route("/models/{name}/install", post(handlers::models::install))
        .route("/models/{name}/load", post(handlers::models::load))
        .route("/model/status", get(handlers::models::status))
        // Chats API
        .route(
            "/chats",
            get(handlers::chats::list).post(handlers::chats::create),
        )
        .route("/chats/{id}", axum::routing::delete(handlers::chats::delete))
        .route("/chats/{id}/messages", get(handlers::chats::messages))
        // Query API
        .route("/query", post(handlers::query::query))
        // Settings API
        .route(
            "/settings/generation",
            get(handlers::settings::get).put(handlers::settings::update),
        )
}

/// Create the main Axum router with all API routes.
///
/// # Path Parameter Syntax
/// Axum 0.8 uses brace syntax for path parameters: `{id}`, `{name}`
pub fn create_router(state: AppState, cors_config: &CorsConfig) -> Router {
    let cors = build_cors_layer(cors_config);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes().with_state(state).layer(cors))
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint.
pub(crate) async fn health_check() -> &'static str {
    "OK"
}
