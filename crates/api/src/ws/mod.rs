//! WebSocket transport for agents and clients.
//!
//! Provides the connection manager (outbound channel per connection), the
//! heartbeat task, and the HTTP upgrade handler used by the Axum router.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
