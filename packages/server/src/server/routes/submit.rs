use axum::extract::rejection::JsonRejection;
use axum::extract::Extension;
use axum::Json;
use serde::Deserialize;

use crate::kernel::jobs::submit::submit_task;
use crate::kernel::jobs::TaskEnvelope;
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitBody {
    task: TaskEnvelope,
}

/// Submit a task to the scheduler and register the job for monitoring.
///
/// On success the original task envelope is echoed back to the client.
pub async fn submit_handler(
    Extension(state): Extension<AppState>,
    payload: Result<Json<SubmitBody>, JsonRejection>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    let Json(body) = payload
        .map_err(|rejection| ApiError::validation(format!("invalid task envelope: {rejection}")))?;
    let outcome = submit_task(&state.deps, body.task).await?;
    Ok(Json(outcome.task))
}
