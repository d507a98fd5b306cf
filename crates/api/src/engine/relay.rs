use std::sync::Arc;

use axum::extract::ws::Message;
use printrelay_core::error::CoreError;
use printrelay_core::messages::{PrintQueued, PrintRequest, ServerMessage};
use printrelay_core::registry::AgentSnapshot;
use printrelay_core::relay::{Delivery, Relay, RelayStats};
use tokio::sync::Mutex;

use crate::ws::WsManager;

/// Process-wide routing service.
///
/// Created once at startup and shared via `Arc`. All registry, session and
/// rotation state sits behind a single mutex, so events are applied one at a
/// time; deliveries are queued on the target connection after the lock is
/// released and never awaited.
pub struct RelayService {
    relay: Mutex<Relay>,
    ws_manager: Arc<WsManager>,
}

impl RelayService {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self {
            relay: Mutex::new(Relay::new()),
            ws_manager,
        }
    }

    pub async fn connect(&self, conn_id: &str) {
        self.relay.lock().await.connect(conn_id);
    }

    /// Apply one raw text frame. Returns the number of messages delivered.
    pub async fn handle_text(&self, conn_id: &str, text: &str) -> usize {
        let deliveries = self.relay.lock().await.handle_text(conn_id, text);
        self.deliver(deliveries).await
    }

    /// Reply `invalid_message` to a frame that never reached the parser.
    pub async fn reject(&self, conn_id: &str, reason: &str) {
        let delivery = Delivery::new(
            conn_id,
            ServerMessage::InvalidMessage {
                reason: reason.to_string(),
            },
        );
        self.deliver(vec![delivery]).await;
    }

    /// Round-robin submission for `POST /print`.
    pub async fn submit_print(&self, request: PrintRequest) -> Result<PrintQueued, CoreError> {
        let dispatch = self.relay.lock().await.submit_print(request)?;
        let queued = PrintQueued::new(dispatch.agent.agent_id.clone());
        self.deliver(vec![dispatch.into()]).await;
        Ok(queued)
    }

    pub async fn disconnect(&self, conn_id: &str) {
        self.relay.lock().await.disconnect(conn_id);
    }

    pub async fn snapshot(&self) -> AgentSnapshot {
        self.relay.lock().await.snapshot()
    }

    pub async fn printer_names(&self) -> Vec<String> {
        self.relay.lock().await.printer_names()
    }

    pub async fn stats(&self) -> RelayStats {
        self.relay.lock().await.stats()
    }

    /// Drop all routing state. Called once the server stopped accepting
    /// connections.
    pub async fn shutdown(&self) {
        self.relay.lock().await.shutdown();
    }

    /// Queue each delivery on its connection. Failures are logged and
    /// dropped; there is no redelivery.
    async fn deliver(&self, deliveries: Vec<Delivery>) -> usize {
        let mut delivered = 0;
        for delivery in deliveries {
            let text = match delivery.message.to_text() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(conn_id = %delivery.conn_id, error = %e, "Failed to encode outbound message");
                    continue;
                }
            };
            if self
                .ws_manager
                .send_to(&delivery.conn_id, Message::Text(text.into()))
                .await
            {
                delivered += 1;
            } else {
                tracing::warn!(conn_id = %delivery.conn_id, "Delivery target is gone, message dropped");
            }
        }
        delivered
    }
}
