pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the relay route tree.
///
/// ```text
/// /ws          WebSocket (agents and clients)
/// /agents      registry snapshot (GET)
/// /printers    registered printer names (GET)
/// /print       branch-routed round-robin submission (POST)
/// ```
pub fn relay_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/agents", get(handlers::agents::list_agents))
        .route("/printers", get(handlers::agents::list_printers))
        .route("/print", post(handlers::print::submit_print))
}
