use axum::extract::State;
use axum::{routing::get, Json, Router};
use printrelay_core::types::Timestamp;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Open WebSocket connections.
    pub connections: usize,
    /// Registered agents.
    pub agents: usize,
    /// When the longest-lived open WebSocket was established.
    pub oldest_connection_at: Option<Timestamp>,
}

/// GET /health -- returns service status and relay counters.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.relay.stats().await;

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        connections: state.ws_manager.connection_count().await,
        agents: stats.agents,
        oldest_connection_at: state.ws_manager.oldest_connected_at().await,
    })
}

/// Mount health check routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
