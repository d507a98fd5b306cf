use std::sync::Arc;

use crate::config::ServerConfig;
use crate::engine::RelayService;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (agents and clients).
    pub ws_manager: Arc<WsManager>,
    /// Routing engine.
    pub relay: Arc<RelayService>,
}

impl AppState {
    /// Wire a fresh manager and relay together.
    pub fn new(config: ServerConfig) -> Self {
        let ws_manager = Arc::new(WsManager::new());
        let relay = Arc::new(RelayService::new(Arc::clone(&ws_manager)));
        Self {
            config: Arc::new(config),
            ws_manager,
            relay,
        }
    }
}
