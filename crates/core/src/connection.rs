//! Liveness table for transport connections.
//!
//! Tracks which connection ids are currently open and whether any agent
//! triples have been announced over them. The transport owns the actual
//! channels; this table only records what the registry may reference.

use std::collections::HashMap;

use indexmap::IndexSet;

use crate::types::{AgentKey, ConnId};

/// Lifecycle of a single connection.
///
/// `Disconnected` is never stored: closing a connection removes its entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Open, nothing registered over it yet.
    Connected,
    /// One or more agent triples announced over this connection.
    Registered(IndexSet<AgentKey>),
    Disconnected,
}

#[derive(Debug, Default)]
pub struct ConnectionTable {
    connections: HashMap<ConnId, ConnectionState>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened connection. Re-opening an id resets its state.
    pub fn open(&mut self, conn_id: ConnId) {
        self.connections.insert(conn_id, ConnectionState::Connected);
    }

    /// Note that `key` was registered over `conn_id`.
    ///
    /// Returns `false` when the connection is not live.
    pub fn mark_registered(&mut self, conn_id: &str, key: AgentKey) -> bool {
        let Some(state) = self.connections.get_mut(conn_id) else {
            return false;
        };
        match state {
            ConnectionState::Registered(keys) => {
                keys.insert(key);
            }
            state => {
                let mut keys = IndexSet::new();
                keys.insert(key);
                *state = ConnectionState::Registered(keys);
            }
        }
        true
    }

    /// Forget that `key` is bound to `conn_id`.
    ///
    /// Used when an agent is replaced or relocated onto another connection.
    pub fn release(&mut self, conn_id: &str, key: &AgentKey) {
        let Some(state) = self.connections.get_mut(conn_id) else {
            return;
        };
        if let ConnectionState::Registered(bound) = state {
            bound.shift_remove(key);
            if bound.is_empty() {
                *state = ConnectionState::Connected;
            }
        }
    }

    pub fn is_live(&self, conn_id: &str) -> bool {
        self.connections.contains_key(conn_id)
    }

    /// Current state of `conn_id`; unknown ids read as `Disconnected`.
    pub fn state(&self, conn_id: &str) -> ConnectionState {
        self.connections
            .get(conn_id)
            .cloned()
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// Remove a connection. Idempotent.
    pub fn close(&mut self, conn_id: &str) -> Option<ConnectionState> {
        self.connections.remove(conn_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn clear(&mut self) {
        self.connections.clear();
    }
}
