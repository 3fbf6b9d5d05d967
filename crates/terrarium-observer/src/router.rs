//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use terrarium_core::HistoryReader;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router<H: HistoryReader + 'static>(state: Arc<AppState<H>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws", get(ws::ws_updates))
        // REST API
        .route("/api/status", get(handlers::status))
        .route("/api/events", get(handlers::events))
        .route("/api/relationships", get(handlers::relationships))
        .route("/api/control/stop", post(handlers::stop))
        .route("/api/control/speed", post(handlers::set_speed))
        .route("/api/inject/event", post(handlers::inject_event))
        .route("/api/inject/message", post(handlers::inject_message))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
