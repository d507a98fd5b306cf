//! Read-only views of the agent registry.

use axum::extract::State;
use axum::Json;
use printrelay_core::registry::AgentSnapshot;

use crate::state::AppState;

/// GET /agents -- nested `business -> branch -> agent` snapshot.
pub async fn list_agents(State(state): State<AppState>) -> Json<AgentSnapshot> {
    Json(state.relay.snapshot().await)
}

/// GET /printers -- names of every registered printer.
pub async fn list_printers(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.relay.printer_names().await)
}
