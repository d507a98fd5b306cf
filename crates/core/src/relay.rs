//! Event processor tying the routing components together.
//!
//! [`Relay`] is the single owner of all routing state. The transport feeds
//! it one event at a time and performs the [`Delivery`] commands it returns;
//! no method blocks or waits on an agent.

use serde::Serialize;

use crate::connection::ConnectionTable;
use crate::dispatcher::{Dispatch, Dispatcher};
use crate::error::CoreError;
use crate::jobs::JobTracker;
use crate::messages::{ClientMessage, PrintRequest, RegisterAgent, ServerMessage, UpdateIds};
use crate::registry::{AgentRecord, AgentRegistry, AgentSnapshot};
use crate::sessions::SessionBinder;
use crate::types::{AgentKey, ConnId};

/// "Send `message` to connection `conn_id`".
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub conn_id: ConnId,
    pub message: ServerMessage,
}

impl Delivery {
    pub fn new(conn_id: impl Into<ConnId>, message: ServerMessage) -> Self {
        Self {
            conn_id: conn_id.into(),
            message,
        }
    }
}

impl From<Dispatch> for Delivery {
    fn from(dispatch: Dispatch) -> Self {
        Self::new(dispatch.connection_id, dispatch.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    pub connections: usize,
    pub agents: usize,
    pub sessions: usize,
}

#[derive(Debug, Default)]
pub struct Relay {
    connections: ConnectionTable,
    registry: AgentRegistry,
    sessions: SessionBinder,
    dispatcher: Dispatcher,
    jobs: JobTracker,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, conn_id: impl Into<ConnId>) {
        let conn_id = conn_id.into();
        tracing::debug!(conn_id = %conn_id, "Connection opened");
        self.connections.open(conn_id);
    }

    /// Parse one text frame and handle it.
    ///
    /// Frames that fail to parse are answered with `invalid_message` and do
    /// not touch any routing state.
    pub fn handle_text(&mut self, conn_id: &str, text: &str) -> Vec<Delivery> {
        match ClientMessage::parse(text) {
            Ok(message) => self.handle(conn_id, message),
            Err(e) => {
                tracing::warn!(conn_id, error = %e, "Rejected inbound message");
                vec![Delivery::new(
                    conn_id,
                    ServerMessage::InvalidMessage {
                        reason: e.to_string(),
                    },
                )]
            }
        }
    }

    pub fn handle(&mut self, conn_id: &str, mut message: ClientMessage) -> Vec<Delivery> {
        message.normalize();
        tracing::trace!(conn_id, event = message.event_name(), "Inbound event");
        match message {
            ClientMessage::RegisterAgent(register) => {
                self.register_agent(conn_id, register);
                Vec::new()
            }
            ClientMessage::BindUser(bind) => {
                let agent = bind.agent_key();
                self.sessions.bind(bind.user_id.clone(), &agent);
                self.jobs.note_requester(bind.user_id.clone(), conn_id);
                tracing::info!(conn_id, user_id = %bind.user_id, agent = %agent, "User bound");
                Vec::new()
            }
            ClientMessage::UpdateIds(update) => {
                self.update_ids(conn_id, update);
                Vec::new()
            }
            ClientMessage::PrintJob(job) => {
                self.jobs.note_requester(job.user_id.clone(), conn_id);
                let routed = self.dispatcher.dispatch_to_session(
                    &mut self.registry,
                    &self.sessions,
                    &self.jobs,
                    &job.user_id,
                    job.payload,
                );
                match routed {
                    Ok(dispatch) => {
                        tracing::info!(
                            conn_id,
                            user_id = %job.user_id,
                            agent = %dispatch.agent,
                            target = %dispatch.connection_id,
                            "Print job dispatched",
                        );
                        vec![dispatch.into()]
                    }
                    Err(e) => {
                        tracing::warn!(conn_id, user_id = %job.user_id, error = %e, "Print job not routed");
                        vec![Delivery::new(
                            conn_id,
                            ServerMessage::PrintError {
                                reason: e.to_string(),
                            },
                        )]
                    }
                }
            }
            ClientMessage::PrintDone(done) => {
                let completion =
                    self.jobs
                        .on_job_done(&mut self.registry, &self.sessions, &done.user_id);
                vec![Delivery::new(
                    self.ack_target(&done.user_id, conn_id),
                    completion.ack,
                )]
            }
            ClientMessage::PrintError(failed) => {
                tracing::warn!(conn_id, user_id = %failed.user_id, error = %failed.error, "Agent reported print failure");
                let completion = self.jobs.on_job_error(
                    &mut self.registry,
                    &self.sessions,
                    &failed.user_id,
                    failed.error,
                );
                vec![Delivery::new(
                    self.ack_target(&failed.user_id, conn_id),
                    completion.ack,
                )]
            }
        }
    }

    /// Branch-routed, round-robin submission from the HTTP surface.
    pub fn submit_print(&mut self, mut request: PrintRequest) -> Result<Dispatch, CoreError> {
        request.normalize();
        request.validate()?;
        let branch = request.branch();
        let dispatch = self.dispatcher.dispatch_to_branch(
            &mut self.registry,
            &self.jobs,
            &branch,
            request.content,
            request.user_id,
        )?;
        tracing::info!(
            branch = %branch,
            agent_id = %dispatch.agent.agent_id,
            target = %dispatch.connection_id,
            "Print queued",
        );
        Ok(dispatch)
    }

    /// Tear down a connection and every agent registered over it.
    ///
    /// Session bindings that point at the removed agents are kept.
    pub fn disconnect(&mut self, conn_id: &str) -> Vec<AgentKey> {
        self.connections.close(conn_id);
        let forgotten = self.jobs.forget_connection(conn_id);
        if forgotten > 0 {
            tracing::debug!(conn_id, users = forgotten, "Requester entries dropped");
        }
        let removed: Vec<AgentKey> = self
            .registry
            .remove_by_connection(conn_id)
            .iter()
            .map(AgentRecord::key)
            .collect();
        if removed.is_empty() {
            tracing::debug!(conn_id, "Connection closed");
        } else {
            tracing::info!(conn_id, agents = removed.len(), "Agent connection closed");
        }
        removed
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionBinder {
        &self.sessions
    }

    pub fn connections(&self) -> &ConnectionTable {
        &self.connections
    }

    pub fn jobs(&self) -> &JobTracker {
        &self.jobs
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        self.registry.snapshot()
    }

    pub fn printer_names(&self) -> Vec<String> {
        self.registry.printer_names()
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            connections: self.connections.len(),
            agents: self.registry.len(),
            sessions: self.sessions.len(),
        }
    }

    /// Drop all routing state.
    pub fn shutdown(&mut self) {
        let stats = self.stats();
        self.connections.clear();
        self.registry.clear();
        self.sessions.clear();
        self.dispatcher.clear();
        self.jobs.clear();
        tracing::info!(
            connections = stats.connections,
            agents = stats.agents,
            sessions = stats.sessions,
            "Relay state cleared",
        );
    }

    fn register_agent(&mut self, conn_id: &str, register: RegisterAgent) {
        if !self.connections.is_live(conn_id) {
            tracing::warn!(conn_id, agent_id = %register.agent_id, "Registration on unknown connection ignored");
            return;
        }
        let key = match register.routing_key() {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(conn_id, agent_id = %register.agent_id, error = %e, "Registration ignored");
                return;
            }
        };

        if let Some(replaced) = self
            .registry
            .register(key.clone(), register.printer_name.clone(), conn_id)
        {
            self.connections.release(&replaced.connection_id, &key);
        }
        self.connections.mark_registered(conn_id, key.clone());
        tracing::info!(
            conn_id,
            business_id = %key.business_id(),
            branch_id = %key.branch_id(),
            agent_id = %key.agent_id,
            printer = %register.printer_name,
            "Agent registered",
        );
    }

    fn update_ids(&mut self, conn_id: &str, update: UpdateIds) {
        if !self.connections.is_live(conn_id) {
            tracing::warn!(conn_id, agent_id = %update.agent_id, "Relocation on unknown connection ignored");
            return;
        }
        let source = update.source();
        let relocation =
            self.registry
                .move_agent(&update.agent_id, source.as_ref(), update.target(), conn_id);
        for displaced in &relocation.displaced {
            self.connections
                .release(&displaced.connection_id, &displaced.key());
        }
        let key = relocation.record.key();
        self.connections.mark_registered(conn_id, key.clone());
        match relocation.from {
            Some(from) => tracing::info!(conn_id, from = %from, to = %key, "Agent relocated"),
            None => tracing::info!(conn_id, to = %key, "Unregistered agent placed"),
        }
    }

    /// Acknowledgments go to the connection that submitted the user's work
    /// while it is still open, otherwise back to the reporter.
    fn ack_target(&self, user_id: &str, reporter: &str) -> ConnId {
        self.jobs
            .requester(user_id)
            .filter(|conn| self.connections.is_live(conn))
            .cloned()
            .unwrap_or_else(|| reporter.to_string())
    }
}
