//! Monitoring operations: register a job for tracking, merge the
//! scheduler and store views of a job, cancel a managed job.

use thiserror::Error;

use super::job::{TaskEnvelope, TrackedJob};
use super::store::{JobStore, StoreError};
use crate::kernel::deps::ServerDeps;
use crate::kernel::notify::Notifier;
use crate::kernel::slurm::{JobSnapshot, SchedulerClient, SchedulerError, SlurmState};

#[derive(Debug, Error)]
pub enum MonitorError {
    /// Registration of an id the scheduler does not recognize.
    #[error("job {0} is not known to the scheduler")]
    UnknownToScheduler(i64),

    /// Neither the scheduler nor the store has information for the id.
    #[error("no information for job {0}")]
    NotFound(i64),

    /// Cancellation of a job this proxy is not managing.
    #[error("job {0} is not under management")]
    NotTracked(i64),

    #[error("failed to cancel job {0}: {1}")]
    CancelFailed(i64, SchedulerError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What registration did with the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The job is now (or was already) tracked, with this observed state.
    Tracked(SlurmState),
    /// The job was already terminal on first observation: notified
    /// immediately, nothing persisted.
    AlreadyTerminal(SlurmState),
}

/// Register a job for lifecycle monitoring.
///
/// The scheduler is consulted for the current state; a job it does not
/// recognize cannot be monitored. Re-registering a tracked id is a no-op
/// success — the storage layer keeps the first record.
pub async fn register_job(
    deps: &ServerDeps,
    job_id: i64,
    task: TaskEnvelope,
) -> Result<RegisterOutcome, MonitorError> {
    let snapshot = deps
        .scheduler
        .query_job(job_id)
        .await?
        .ok_or(MonitorError::UnknownToScheduler(job_id))?;
    let observed = snapshot.state;

    if observed.is_terminal() {
        if let Err(err) = deps
            .notifier
            .emit(job_id, SlurmState::Unknown, observed, &task)
            .await
        {
            tracing::warn!(job_id, error = %err, "failed to notify already-terminal job");
        }
        tracing::info!(job_id, state = %observed, "job terminal at registration, not tracking");
        return Ok(RegisterOutcome::AlreadyTerminal(observed));
    }

    let inserted = deps
        .store
        .insert(&TrackedJob::new(job_id, observed, task))
        .await?;
    if inserted {
        tracing::info!(job_id, state = %observed, "job registered for monitoring");
    } else {
        tracing::debug!(job_id, "job already under monitoring");
    }
    Ok(RegisterOutcome::Tracked(observed))
}

/// Combined scheduler + store view of a job.
#[derive(Debug)]
pub struct JobStatus {
    pub snapshot: Option<JobSnapshot>,
    pub record: Option<TrackedJob>,
}

/// Look a job up in both sources. `NotFound` iff neither knows the id.
pub async fn job_status(deps: &ServerDeps, job_id: i64) -> Result<JobStatus, MonitorError> {
    let snapshot = deps.scheduler.query_job(job_id).await?;
    let record = deps.store.find(job_id).await?;
    if snapshot.is_none() && record.is_none() {
        return Err(MonitorError::NotFound(job_id));
    }
    Ok(JobStatus { snapshot, record })
}

/// Cancel a managed job at the scheduler, then drop its record.
///
/// Jobs not under management are refused before any scheduler call. The
/// find/take split can race a concurrent removal; losing that race
/// surfaces as `NotTracked`, which is safe either way.
pub async fn cancel_job(deps: &ServerDeps, job_id: i64) -> Result<TrackedJob, MonitorError> {
    if deps.store.find(job_id).await?.is_none() {
        return Err(MonitorError::NotTracked(job_id));
    }
    deps.scheduler
        .cancel(job_id)
        .await
        .map_err(|err| MonitorError::CancelFailed(job_id, err))?;
    let removed = deps
        .store
        .take(job_id)
        .await?
        .ok_or(MonitorError::NotTracked(job_id))?;
    tracing::info!(job_id, "cancelled job and removed it from monitoring");
    Ok(removed)
}
