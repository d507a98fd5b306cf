use crate::types::{AgentKey, BranchKey};

/// Routing and validation failures raised by the relay core.
///
/// The `Display` text doubles as the `reason` sent to the requesting
/// connection in `print_error` / `invalid_message` events.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("No agent bound to user {user_id}")]
    NoSessionBound { user_id: String },

    #[error("Agent {agent} is not connected")]
    NoAgentAvailable { agent: AgentKey },

    #[error("No agents available for branch {branch}")]
    NoAgentsAvailable { branch: BranchKey },

    #[error("Missing routing key: {0}")]
    MissingRoutingKeys(&'static str),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
