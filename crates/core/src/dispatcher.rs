//! Job routing: session-routed and branch-routed (round-robin) dispatch.
//!
//! Both modes end the same way: the chosen agent's counter is bumped and a
//! [`Dispatch`] naming the target connection is handed back for the
//! transport to deliver. Delivery is fire-and-forget.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::CoreError;
use crate::jobs::JobTracker;
use crate::messages::ServerMessage;
use crate::registry::AgentRegistry;
use crate::sessions::SessionBinder;
use crate::types::{AgentKey, BranchKey, ConnId};

/// A routed job, ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub agent: AgentKey,
    pub connection_id: ConnId,
    pub message: ServerMessage,
}

/// Per-branch rotation counters.
///
/// A cursor only ever grows; it is taken modulo the branch's current agent
/// count, so churn shifts positions rather than resetting the rotation.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursors: HashMap<BranchKey, u64>,
}

impl RoundRobin {
    /// Pick an index into a list of `len` agents and advance the cursor.
    ///
    /// An empty list yields `None` and leaves the cursor untouched.
    pub fn next_index(&mut self, branch: &BranchKey, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let cursor = self.cursors.entry(branch.clone()).or_insert(0);
        let index = (*cursor % len as u64) as usize;
        *cursor = cursor.wrapping_add(1);
        Some(index)
    }

    pub fn cursor(&self, branch: &BranchKey) -> u64 {
        self.cursors.get(branch).copied().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.cursors.clear();
    }
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    rotation: RoundRobin,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `payload` to the agent `user_id` is bound to.
    ///
    /// Fails without touching the registry when the user has no binding or
    /// the bound agent is gone.
    pub fn dispatch_to_session(
        &self,
        registry: &mut AgentRegistry,
        sessions: &SessionBinder,
        jobs: &JobTracker,
        user_id: &str,
        payload: Value,
    ) -> Result<Dispatch, CoreError> {
        let session = sessions
            .resolve(user_id)
            .ok_or_else(|| CoreError::NoSessionBound {
                user_id: user_id.to_string(),
            })?;
        let agent = session.agent_key();
        let connection_id = registry
            .lookup(&agent)
            .map(|record| record.connection_id.clone())
            .ok_or_else(|| CoreError::NoAgentAvailable {
                agent: agent.clone(),
            })?;

        jobs.on_job_sent(registry, &agent);
        Ok(Dispatch {
            agent,
            connection_id,
            message: ServerMessage::ExecutePrint {
                payload,
                user_id: Some(user_id.to_string()),
            },
        })
    }

    /// Route `content` to the next agent of `branch` in rotation.
    pub fn dispatch_to_branch(
        &mut self,
        registry: &mut AgentRegistry,
        jobs: &JobTracker,
        branch: &BranchKey,
        content: Value,
        user_id: Option<String>,
    ) -> Result<Dispatch, CoreError> {
        let agents = registry.list_agents_for_branch(branch);
        let index = self
            .rotation
            .next_index(branch, agents.len())
            .ok_or_else(|| CoreError::NoAgentsAvailable {
                branch: branch.clone(),
            })?;
        let agent = branch.agent(&agents[index]);
        let connection_id = registry
            .lookup(&agent)
            .map(|record| record.connection_id.clone())
            .ok_or_else(|| CoreError::Internal(format!("agent {agent} listed but not found")))?;

        jobs.on_job_sent(registry, &agent);
        Ok(Dispatch {
            agent,
            connection_id,
            message: ServerMessage::ExecutePrint {
                payload: content,
                user_id,
            },
        })
    }

    pub fn cursor(&self, branch: &BranchKey) -> u64 {
        self.rotation.cursor(branch)
    }

    pub fn clear(&mut self) {
        self.rotation.clear();
    }
}
