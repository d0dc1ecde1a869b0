//! Axum router construction for the Fleetsim API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the API server.
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/readings", get(ws::ws_readings))
        // Scheduler lifecycle
        .route("/api/start", get(handlers::start))
        .route("/api/check", get(handlers::check))
        .route("/api/end", get(handlers::end))
        .route("/api/dropall", get(handlers::dropall))
        // Device catalog
        .route("/api/register", post(handlers::register))
        .route("/api/fetch-device", get(handlers::fetch_device))
        // Aggregate queries
        .route("/api/average", get(handlers::average))
        .route("/api/max", get(handlers::max))
        .route("/api/min", get(handlers::min))
        .route("/api/info", post(handlers::info_stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
