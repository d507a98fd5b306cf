//! In-flight job bookkeeping layered on the agent registry.
//!
//! There is no job table: a job exists only as the counter bump it causes
//! on its target agent and the acknowledgment it eventually produces.

use std::collections::HashMap;

use serde_json::Value;

use crate::messages::{AckStatus, ServerMessage};
use crate::registry::AgentRegistry;
use crate::sessions::SessionBinder;
use crate::types::{AgentKey, ConnId};

/// Outcome of a done/error report.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub user_id: String,
    /// Agent whose counter was lowered; `None` when the session or agent
    /// was gone by the time the report arrived.
    pub agent: Option<AgentKey>,
    pub ack: ServerMessage,
}

#[derive(Debug, Default)]
pub struct JobTracker {
    /// Connection that last submitted work on behalf of each user.
    requesters: HashMap<String, ConnId>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember which connection acts for `user_id`.
    pub fn note_requester(&mut self, user_id: impl Into<String>, conn_id: impl Into<ConnId>) {
        self.requesters.insert(user_id.into(), conn_id.into());
    }

    pub fn requester(&self, user_id: &str) -> Option<&ConnId> {
        self.requesters.get(user_id)
    }

    /// Forget every user whose requester was `conn_id`. Returns how many.
    pub fn forget_connection(&mut self, conn_id: &str) -> usize {
        let before = self.requesters.len();
        self.requesters.retain(|_, conn| conn != conn_id);
        before - self.requesters.len()
    }

    pub fn requester_count(&self) -> usize {
        self.requesters.len()
    }

    /// Count a job delivered to `agent`.
    pub fn on_job_sent(&self, registry: &mut AgentRegistry, agent: &AgentKey) -> Option<u32> {
        let in_flight = registry.increment_jobs(agent);
        tracing::debug!(agent = %agent, ?in_flight, "Job sent");
        in_flight
    }

    pub fn on_job_done(
        &self,
        registry: &mut AgentRegistry,
        sessions: &SessionBinder,
        user_id: &str,
    ) -> Completion {
        self.complete(registry, sessions, user_id, AckStatus::Done, None)
    }

    pub fn on_job_error(
        &self,
        registry: &mut AgentRegistry,
        sessions: &SessionBinder,
        user_id: &str,
        error: Value,
    ) -> Completion {
        self.complete(registry, sessions, user_id, AckStatus::Error, Some(error))
    }

    pub fn clear(&mut self) {
        self.requesters.clear();
    }

    fn complete(
        &self,
        registry: &mut AgentRegistry,
        sessions: &SessionBinder,
        user_id: &str,
        status: AckStatus,
        error: Option<Value>,
    ) -> Completion {
        let agent = sessions.resolve(user_id).map(|s| s.agent_key());
        let agent = match agent {
            Some(key) => match registry.decrement_jobs(&key) {
                Some(in_flight) => {
                    tracing::debug!(agent = %key, in_flight, ?status, "Job finished");
                    Some(key)
                }
                None => {
                    tracing::debug!(agent = %key, ?status, "Job finished on departed agent");
                    None
                }
            },
            None => {
                tracing::debug!(user_id, ?status, "Job finished without a bound session");
                None
            }
        };

        Completion {
            user_id: user_id.to_string(),
            agent,
            ack: ServerMessage::Acknowledge {
                status,
                user_id: user_id.to_string(),
                error,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn setup() -> (AgentRegistry, SessionBinder, AgentKey) {
        let mut registry = AgentRegistry::new();
        let mut sessions = SessionBinder::new();
        let key = AgentKey::new("b1", "br1", "a1");
        registry.register(key.clone(), "Epson", "c1");
        sessions.bind("u1", &key);
        (registry, sessions, key)
    }

    #[test]
    fn done_lowers_counter_and_acknowledges() {
        let (mut registry, sessions, key) = setup();
        let tracker = JobTracker::new();
        tracker.on_job_sent(&mut registry, &key);
        tracker.on_job_sent(&mut registry, &key);

        let completion = tracker.on_job_done(&mut registry, &sessions, "u1");

        assert_eq!(completion.agent, Some(key.clone()));
        assert_eq!(registry.lookup(&key).unwrap().in_flight_jobs, 1);
        assert_matches!(
            completion.ack,
            ServerMessage::Acknowledge { status: AckStatus::Done, error: None, .. }
        );
    }

    #[test]
    fn error_carries_detail() {
        let (mut registry, sessions, key) = setup();
        let tracker = JobTracker::new();
        tracker.on_job_sent(&mut registry, &key);

        let completion =
            tracker.on_job_error(&mut registry, &sessions, "u1", json!("paper jam"));

        assert_eq!(registry.lookup(&key).unwrap().in_flight_jobs, 0);
        assert_eq!(
            completion.ack,
            ServerMessage::Acknowledge {
                status: AckStatus::Error,
                user_id: "u1".into(),
                error: Some(json!("paper jam")),
            }
        );
    }

    #[test]
    fn unbound_user_still_gets_ack() {
        let (mut registry, sessions, key) = setup();
        let tracker = JobTracker::new();
        tracker.on_job_sent(&mut registry, &key);

        let completion = tracker.on_job_done(&mut registry, &sessions, "stranger");

        assert!(completion.agent.is_none());
        assert_eq!(registry.lookup(&key).unwrap().in_flight_jobs, 1);
        assert_matches!(completion.ack, ServerMessage::Acknowledge { .. });
    }

    #[test]
    fn extra_reports_never_underflow() {
        let (mut registry, sessions, key) = setup();
        let tracker = JobTracker::new();
        tracker.on_job_sent(&mut registry, &key);

        for _ in 0..3 {
            tracker.on_job_done(&mut registry, &sessions, "u1");
            tracker.on_job_error(&mut registry, &sessions, "u1", Value::Null);
        }

        assert_eq!(registry.lookup(&key).unwrap().in_flight_jobs, 0);
    }

    #[test]
    fn requester_is_last_writer() {
        let mut tracker = JobTracker::new();
        tracker.note_requester("u1", "c1");
        tracker.note_requester("u1", "c2");
        assert_eq!(tracker.requester("u1").map(String::as_str), Some("c2"));
        assert!(tracker.requester("u2").is_none());
    }

    #[test]
    fn closed_connection_releases_its_users() {
        let mut tracker = JobTracker::new();
        tracker.note_requester("u1", "c1");
        tracker.note_requester("u2", "c1");
        tracker.note_requester("u3", "c2");

        assert_eq!(tracker.forget_connection("c1"), 2);

        assert_eq!(tracker.requester_count(), 1);
        assert_eq!(tracker.requester("u3").map(String::as_str), Some("c2"));
        assert_eq!(tracker.forget_connection("c1"), 0);
    }
}
