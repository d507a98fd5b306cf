//! End-user session bindings: user id -> target agent.
//!
//! Bindings are never removed, only overwritten. A binding may outlive the
//! agent it points at; dispatch then fails with `NoAgentAvailable` until the
//! user is rebound.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::AgentKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub user_id: String,
    pub business_id: String,
    pub branch_id: String,
    pub agent_id: String,
}

impl UserSession {
    pub fn agent_key(&self) -> AgentKey {
        AgentKey::new(&self.business_id, &self.branch_id, &self.agent_id)
    }
}

#[derive(Debug, Default)]
pub struct SessionBinder {
    sessions: HashMap<String, UserSession>,
}

impl SessionBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `user_id` to `agent`, replacing any earlier binding.
    pub fn bind(&mut self, user_id: impl Into<String>, agent: &AgentKey) -> Option<UserSession> {
        let user_id = user_id.into();
        let session = UserSession {
            user_id: user_id.clone(),
            business_id: agent.business_id().to_string(),
            branch_id: agent.branch_id().to_string(),
            agent_id: agent.agent_id.clone(),
        };
        self.sessions.insert(user_id, session)
    }

    pub fn resolve(&self, user_id: &str) -> Option<&UserSession> {
        self.sessions.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }
}
