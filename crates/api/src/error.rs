use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use printrelay_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for routing and validation errors. Implements
/// [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A routing or validation error from `printrelay_core`.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NoAgentsAvailable { .. } => {
                    (StatusCode::NOT_FOUND, "NO_AGENTS_AVAILABLE", core.to_string())
                }
                CoreError::NoAgentAvailable { .. } => {
                    (StatusCode::NOT_FOUND, "NO_AGENT_AVAILABLE", core.to_string())
                }
                CoreError::NoSessionBound { .. } => {
                    (StatusCode::NOT_FOUND, "NO_SESSION_BOUND", core.to_string())
                }
                CoreError::MissingRoutingKeys(_) => {
                    (StatusCode::BAD_REQUEST, "MISSING_ROUTING_KEYS", core.to_string())
                }
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
