//! Router assembly for the steptrace HTTP API.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the complete axum router.
///
/// CORS is permissive (the visualizer may be served from anywhere).
/// TraceLayer provides request-level logging via tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/v1/languages", get(handlers::health::languages))
        .route(
            "/api/v1/execution/trace",
            post(handlers::execution::trace),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
