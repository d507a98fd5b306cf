use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport-assigned identifier of a live connection.
pub type ConnId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Tenant scope of a group of agents: one branch of one business.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchKey {
    pub business_id: String,
    pub branch_id: String,
}

impl BranchKey {
    pub fn new(business_id: impl Into<String>, branch_id: impl Into<String>) -> Self {
        Self {
            business_id: business_id.into(),
            branch_id: branch_id.into(),
        }
    }

    /// Qualify an agent id with this branch.
    pub fn agent(&self, agent_id: impl Into<String>) -> AgentKey {
        AgentKey {
            branch: self.clone(),
            agent_id: agent_id.into(),
        }
    }
}

impl fmt::Display for BranchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.business_id, self.branch_id)
    }
}

/// Full address of one agent: business, branch and agent id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentKey {
    pub branch: BranchKey,
    pub agent_id: String,
}

impl AgentKey {
    pub fn new(
        business_id: impl Into<String>,
        branch_id: impl Into<String>,
        agent_id: impl Into<String>,
    ) -> Self {
        BranchKey::new(business_id, branch_id).agent(agent_id)
    }

    pub fn business_id(&self) -> &str {
        &self.branch.business_id
    }

    pub fn branch_id(&self) -> &str {
        &self.branch.branch_id
    }
}

impl fmt::Display for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.branch, self.agent_id)
    }
}
