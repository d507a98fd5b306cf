use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use printrelay_core::error::CoreError;
use printrelay_core::messages::{PrintQueued, PrintRequest};

use crate::error::AppResult;
use crate::state::AppState;

/// POST /print -- hand `content` to the next agent of the branch.
///
/// Responds as soon as the job is queued on the agent's connection; the
/// agent's completion report arrives later over the socket. A body that
/// cannot be decoded is a validation failure like a blank branch.
pub async fn submit_print(
    State(state): State<AppState>,
    payload: Result<Json<PrintRequest>, JsonRejection>,
) -> AppResult<Json<PrintQueued>> {
    let Json(request) = payload.map_err(|e| CoreError::Validation(e.body_text()))?;
    let queued = state.relay.submit_print(request).await?;
    Ok(Json(queued))
}
