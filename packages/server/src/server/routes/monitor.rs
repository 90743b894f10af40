//! Monitoring endpoints: register externally-submitted jobs, inspect a
//! job through both the scheduler and the store, query by state, cancel.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::kernel::jobs::monitor::{cancel_job, job_status, register_job};
use crate::kernel::jobs::{TaskEnvelope, TrackedJob};
use crate::kernel::slurm::{JobSnapshot, SchedulerClient, SlurmState};
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterBody {
    job: RegisterJob,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterJob {
    slurm_job_id: i64,
    task: TaskEnvelope,
}

/// Register an externally-submitted job for lifecycle tracking.
pub async fn register_handler(
    Extension(state): Extension<AppState>,
    payload: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<Json<RegisterJob>, ApiError> {
    let Json(body) = payload
        .map_err(|rejection| ApiError::validation(format!("invalid job body: {rejection}")))?;
    let RegisterJob { slurm_job_id, task } = body.job;
    register_job(&state.deps, slurm_job_id, task.clone()).await?;
    Ok(Json(RegisterJob { slurm_job_id, task }))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    scheduler: SchedulerView,
    store: Option<TrackedJob>,
}

#[derive(Debug, Serialize)]
pub struct SchedulerView {
    job_id: i64,
    state: SlurmState,
}

/// Current job state as the scheduler and the store each see it.
/// 404 only when neither source knows the id.
pub async fn status_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<i64>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = job_status(&state.deps, job_id).await?;
    Ok(Json(StatusResponse {
        scheduler: SchedulerView {
            job_id,
            state: status
                .snapshot
                .map(|snapshot| snapshot.state)
                .unwrap_or(SlurmState::Unknown),
        },
        store: status.record,
    }))
}

#[derive(Debug, Serialize)]
pub struct JobsResponse {
    jobs: Vec<JobSnapshot>,
}

/// All scheduler jobs currently in the given canonical state.
pub async fn by_state_handler(
    Extension(state): Extension<AppState>,
    Path(raw_state): Path<String>,
) -> Result<Json<JobsResponse>, ApiError> {
    let Some(wanted) = SlurmState::parse_known(&raw_state) else {
        return Err(ApiError::unknown_state(&raw_state));
    };
    let jobs = state
        .deps
        .scheduler
        .query_by_state(wanted)
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?;
    Ok(Json(JobsResponse { jobs }))
}

/// Cancel a managed job at the scheduler and stop tracking it. Returns
/// the removed record.
pub async fn delete_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<i64>,
) -> Result<Json<TrackedJob>, ApiError> {
    let removed = cancel_job(&state.deps, job_id).await?;
    Ok(Json(removed))
}
