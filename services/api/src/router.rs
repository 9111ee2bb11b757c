//! Axum Router Configuration
//!
//! This module defines the HTTP routing for the application: the browser
//! WebSocket endpoint plus two small introspection routes.

use crate::{state::AppState, ws::ws_handler};
use axum::{Json, Router, routing::get};
use career_tools_core::{ClientEvent, tools::session_update};
use std::sync::Arc;

/// Liveness probe.
async fn health() -> &'static str {
    "ok"
}

/// The `session.update` event sent to every new realtime session.
async fn tools() -> Json<ClientEvent> {
    Json(session_update())
}

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tools", get(tools))
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}
