//! Periodic reconciliation of the store against the scheduler.
//!
//! Each pass walks the tracked jobs and, per job: drops records the
//! scheduler no longer recognizes, applies non-terminal state changes,
//! and on a terminal transition notifies and then deletes — in that
//! order, so a crash between the two duplicates the notification rather
//! than losing it. A single-job failure never aborts the pass.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use super::job::TrackedJob;
use super::store::JobStore;
use crate::kernel::deps::ServerDeps;
use crate::kernel::notify::Notifier;
use crate::kernel::slurm::SchedulerClient;

/// Counters for one completed pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    pub examined: usize,
    pub updated: usize,
    pub removed: usize,
    pub notified: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Completed(PassStats),
    /// A previous pass was still in flight; this tick was dropped, not
    /// queued.
    Skipped,
}

pub struct Reconciler {
    store: Arc<dyn JobStore>,
    scheduler: Arc<dyn SchedulerClient>,
    notifier: Arc<dyn Notifier>,
    gate: Mutex<()>,
}

impl Reconciler {
    pub fn new(deps: &ServerDeps) -> Self {
        Self {
            store: Arc::clone(&deps.store),
            scheduler: Arc::clone(&deps.scheduler),
            notifier: Arc::clone(&deps.notifier),
            gate: Mutex::new(()),
        }
    }

    /// Run one reconciliation pass, unless one is already in flight.
    pub async fn run_once(&self) -> PassOutcome {
        let Ok(_guard) = self.gate.try_lock() else {
            tracing::debug!("reconciliation pass already in flight, skipping tick");
            return PassOutcome::Skipped;
        };

        let jobs = match self.store.all().await {
            Ok(jobs) => jobs,
            Err(err) => {
                tracing::error!(error = %err, "could not list tracked jobs, ending pass");
                return PassOutcome::Completed(PassStats {
                    failed: 1,
                    ..PassStats::default()
                });
            }
        };

        let mut stats = PassStats::default();
        for tracked in jobs {
            stats.examined += 1;
            if let Err(err) = self.reconcile_one(&tracked, &mut stats).await {
                stats.failed += 1;
                tracing::warn!(
                    job_id = tracked.job_id,
                    error = %err,
                    "reconciliation step failed, continuing pass"
                );
            }
        }

        tracing::info!(
            examined = stats.examined,
            updated = stats.updated,
            removed = stats.removed,
            notified = stats.notified,
            failed = stats.failed,
            "reconciliation pass complete"
        );
        PassOutcome::Completed(stats)
    }

    async fn reconcile_one(&self, tracked: &TrackedJob, stats: &mut PassStats) -> Result<()> {
        let Some(snapshot) = self.scheduler.query_job(tracked.job_id).await? else {
            // The scheduler forgot the job; nothing left to track.
            if self.store.delete(tracked.job_id).await? {
                stats.removed += 1;
                tracing::info!(job_id = tracked.job_id, "scheduler no longer knows job, dropped");
            }
            return Ok(());
        };

        let observed = snapshot.state;
        if observed == tracked.state {
            return Ok(());
        }

        if observed.is_terminal() {
            // Emission precedes deletion. If the transport refuses, the
            // record stays and the next pass re-emits: at-least-once.
            self.notifier
                .emit(tracked.job_id, tracked.state, observed, &tracked.task)
                .await?;
            stats.notified += 1;
            if self.store.delete(tracked.job_id).await? {
                stats.removed += 1;
            }
            tracing::info!(
                job_id = tracked.job_id,
                old_state = %tracked.state,
                new_state = %observed,
                "job reached a terminal state"
            );
        } else if self.store.update_state(tracked.job_id, observed).await? {
            stats.updated += 1;
            tracing::debug!(
                job_id = tracked.job_id,
                old_state = %tracked.state,
                new_state = %observed,
                "job state updated"
            );
        }
        Ok(())
    }
}

/// Host the reconciler on its polling interval.
pub async fn start_scheduler(
    reconciler: Arc<Reconciler>,
    interval_minutes: u64,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let period = Duration::from_secs(interval_minutes.max(1) * 60);
    let tick = Job::new_repeated_async(period, move |_uuid, _lock| {
        let reconciler = Arc::clone(&reconciler);
        Box::pin(async move {
            reconciler.run_once().await;
        })
    })?;

    scheduler.add(tick).await?;
    scheduler.start().await?;

    tracing::info!(interval_minutes, "job reconciliation scheduled");
    Ok(scheduler)
}
