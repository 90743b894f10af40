//! Submission service: validate the envelope against the registry, render
//! the submission command, dispatch it, and hand the accepted job to
//! monitoring.

use thiserror::Error;

use super::job::TaskEnvelope;
use super::monitor::{register_job, MonitorError, RegisterOutcome};
use crate::kernel::deps::ServerDeps;
use crate::kernel::slurm::{sbatch::render_submission, SchedulerClient, SchedulerError};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("task {0:?} is not registered")]
    UnknownTask(String),

    #[error("task submission failed: {0}")]
    Submission(#[from] SchedulerError),

    /// The scheduler accepted the job but monitoring could not pick it up.
    #[error("submitted job {job_id} could not be registered: {source}")]
    Registration {
        job_id: i64,
        #[source]
        source: MonitorError,
    },
}

#[derive(Debug)]
pub struct SubmitOutcome {
    pub job_id: i64,
    pub task: TaskEnvelope,
    pub registration: RegisterOutcome,
}

/// Submit a task and register the resulting job for monitoring.
pub async fn submit_task(
    deps: &ServerDeps,
    task: TaskEnvelope,
) -> Result<SubmitOutcome, SubmitError> {
    let descriptor = deps
        .tasks
        .get(&task.name)
        .ok_or_else(|| SubmitError::UnknownTask(task.name.clone()))?;
    let command = render_submission(&task, descriptor);
    let job_id = deps.scheduler.submit(&command).await?;
    tracing::info!(job_id, task = %task.name, uuid = %task.uuid, "task accepted by the scheduler");

    match register_job(deps, job_id, task.clone()).await {
        Ok(registration) => Ok(SubmitOutcome {
            job_id,
            task,
            registration,
        }),
        Err(source) => Err(SubmitError::Registration { job_id, source }),
    }
}
