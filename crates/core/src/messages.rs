//! Typed wire messages exchanged with agents and clients.
//!
//! Socket events use the adjacently tagged shape
//! `{"event": "<name>", "data": {...}}` with camelCase fields. The HTTP
//! print submission keeps the snake_case body of the public API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::{AgentKey, BranchKey};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Events received over a relay connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    RegisterAgent(RegisterAgent),
    BindUser(BindUser),
    UpdateIds(UpdateIds),
    PrintJob(PrintJob),
    PrintDone(PrintDone),
    PrintError(PrintFailed),
}

/// An agent announcing itself and its printer.
///
/// Business and branch are optional on the wire so their absence can be
/// reported as [`CoreError::MissingRoutingKeys`] instead of a parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAgent {
    pub agent_id: String,
    #[serde(default)]
    pub business_id: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
    pub printer_name: String,
}

impl RegisterAgent {
    pub fn routing_key(&self) -> Result<AgentKey, CoreError> {
        let business_id = present(self.business_id.as_deref())
            .ok_or(CoreError::MissingRoutingKeys("businessId"))?;
        let branch_id =
            present(self.branch_id.as_deref()).ok_or(CoreError::MissingRoutingKeys("branchId"))?;
        Ok(AgentKey::new(business_id, branch_id, &self.agent_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindUser {
    pub user_id: String,
    pub business_id: String,
    pub branch_id: String,
    pub agent_id: String,
}

impl BindUser {
    pub fn agent_key(&self) -> AgentKey {
        AgentKey::new(&self.business_id, &self.branch_id, &self.agent_id)
    }
}

/// Relocate an already connected agent to new business/branch keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIds {
    pub agent_id: String,
    pub business_id: String,
    pub branch_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_business_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_branch_id: Option<String>,
}

impl UpdateIds {
    pub fn target(&self) -> BranchKey {
        BranchKey::new(&self.business_id, &self.branch_id)
    }

    /// Source location hint, only when both halves are given.
    pub fn source(&self) -> Option<BranchKey> {
        match (
            present(self.from_business_id.as_deref()),
            present(self.from_branch_id.as_deref()),
        ) {
            (Some(business), Some(branch)) => Some(BranchKey::new(business, branch)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub user_id: String,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintDone {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintFailed {
    pub user_id: String,
    #[serde(default)]
    pub error: Value,
}

impl ClientMessage {
    /// Parse, normalize and validate one text frame.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let mut message: Self = serde_json::from_str(text)
            .map_err(|e| CoreError::Validation(format!("Malformed message: {e}")))?;
        message.normalize();
        message.validate()?;
        Ok(message)
    }

    /// Strip surrounding whitespace from every identifier.
    ///
    /// Registry, session and requester keys are all built from these fields,
    /// so the same padded id resolves to the same key whichever event
    /// carries it.
    pub fn normalize(&mut self) {
        match self {
            Self::RegisterAgent(m) => {
                trim_id(&mut m.agent_id);
                trim_opt_id(&mut m.business_id);
                trim_opt_id(&mut m.branch_id);
            }
            Self::BindUser(m) => {
                trim_id(&mut m.user_id);
                trim_id(&mut m.business_id);
                trim_id(&mut m.branch_id);
                trim_id(&mut m.agent_id);
            }
            Self::UpdateIds(m) => {
                trim_id(&mut m.agent_id);
                trim_id(&mut m.business_id);
                trim_id(&mut m.branch_id);
                trim_opt_id(&mut m.from_business_id);
                trim_opt_id(&mut m.from_branch_id);
            }
            Self::PrintJob(m) => trim_id(&mut m.user_id),
            Self::PrintDone(m) => trim_id(&mut m.user_id),
            Self::PrintError(m) => trim_id(&mut m.user_id),
        }
    }

    /// Wire name of the event, for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::RegisterAgent(_) => "register_agent",
            Self::BindUser(_) => "bind_user",
            Self::UpdateIds(_) => "update_ids",
            Self::PrintJob(_) => "print_job",
            Self::PrintDone(_) => "print_done",
            Self::PrintError(_) => "print_error",
        }
    }

    /// Reject empty identifiers.
    ///
    /// Missing routing keys on `register_agent` are left for the registry
    /// path to report, since they are logged rather than bounced.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::RegisterAgent(m) => require("agentId", &m.agent_id),
            Self::BindUser(m) => {
                require("userId", &m.user_id)?;
                require("businessId", &m.business_id)?;
                require("branchId", &m.branch_id)?;
                require("agentId", &m.agent_id)
            }
            Self::UpdateIds(m) => {
                require("agentId", &m.agent_id)?;
                require("businessId", &m.business_id)?;
                require("branchId", &m.branch_id)
            }
            Self::PrintJob(m) => require("userId", &m.user_id),
            Self::PrintDone(m) => require("userId", &m.user_id),
            Self::PrintError(m) => require("userId", &m.user_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Done,
    Error,
}

/// Events sent to a relay connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Job for the agent owning the receiving connection.
    ExecutePrint {
        payload: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
    /// Routing failed; nothing was delivered.
    PrintError { reason: String },
    /// Completion report for a job submitted by this connection.
    Acknowledge {
        status: AckStatus,
        user_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },
    /// The inbound frame could not be parsed or failed validation.
    InvalidMessage { reason: String },
}

impl ServerMessage {
    pub fn to_text(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::Internal(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// `POST /print` body: branch-routed submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintRequest {
    pub business_id: String,
    pub branch_id: String,
    pub content: Value,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl PrintRequest {
    pub fn branch(&self) -> BranchKey {
        BranchKey::new(&self.business_id, &self.branch_id)
    }

    pub fn normalize(&mut self) {
        trim_id(&mut self.business_id);
        trim_id(&mut self.branch_id);
        trim_opt_id(&mut self.user_id);
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        require("business_id", &self.business_id)?;
        require("branch_id", &self.branch_id)
    }
}

/// `POST /print` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintQueued {
    pub status: String,
    pub agent_id: String,
}

impl PrintQueued {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            status: "queued".to_string(),
            agent_id: agent_id.into(),
        }
    }
}

fn trim_id(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn trim_opt_id(value: &mut Option<String>) {
    if let Some(v) = value {
        trim_id(v);
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn require(field: &str, value: &str) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
