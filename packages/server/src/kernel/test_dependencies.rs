//! Mock implementations for tests.
//!
//! `MockSchedulerClient` is a programmable scheduler: seed it with
//! snapshots, script submission results, and mark jobs whose cancellation
//! or query should fail. `SpyNotifier` records every emission for
//! assertions. Both are shared by unit and integration suites.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::kernel::jobs::TaskEnvelope;
use crate::kernel::notify::Notifier;
use crate::kernel::slurm::{
    test_job_snapshot, JobSnapshot, SchedulerClient, SchedulerError, SlurmState, TEST_JOB_ID,
};

/// Build a plausible snapshot for a job id in a given state.
pub fn snapshot(job_id: i64, state: SlurmState) -> JobSnapshot {
    JobSnapshot {
        job_id: job_id.to_string(),
        job_name: format!("job-{job_id}"),
        state,
        user: "areynolds".to_string(),
        partition: "queue0".to_string(),
        time_limit: "1:00:00".to_string(),
        start: "2025-04-14T08:57:46".to_string(),
        end: "Unknown".to_string(),
        elapsed: "00:10:00".to_string(),
    }
}

#[derive(Default)]
pub struct MockSchedulerClient {
    snapshots: Mutex<HashMap<i64, JobSnapshot>>,
    submit_results: Mutex<VecDeque<Result<i64, String>>>,
    failing_queries: Mutex<HashSet<i64>>,
    failing_cancels: Mutex<HashSet<i64>>,
    submitted: Mutex<Vec<String>>,
    cancelled: Mutex<Vec<i64>>,
}

impl MockSchedulerClient {
    /// Empty scheduler, except for the reserved test job id which answers
    /// with the fixed synthetic snapshot, like the real backends.
    pub fn new() -> Self {
        let mock = Self::default();
        mock.snapshots
            .lock()
            .unwrap()
            .insert(TEST_JOB_ID, test_job_snapshot());
        mock
    }

    pub fn with_job(self, job_id: i64, state: SlurmState) -> Self {
        self.set_state(job_id, state);
        self
    }

    pub fn with_submit_ok(self, job_id: i64) -> Self {
        self.submit_results.lock().unwrap().push_back(Ok(job_id));
        self
    }

    pub fn with_submit_error(self, message: &str) -> Self {
        self.submit_results
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn with_failing_cancel(self, job_id: i64) -> Self {
        self.failing_cancels.lock().unwrap().insert(job_id);
        self
    }

    pub fn with_failing_query(self, job_id: i64) -> Self {
        self.failing_queries.lock().unwrap().insert(job_id);
        self
    }

    /// Set (or replace) the scheduler-side state of a job.
    pub fn set_state(&self, job_id: i64, state: SlurmState) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(job_id, snapshot(job_id, state));
    }

    /// Make the scheduler forget a job entirely.
    pub fn forget(&self, job_id: i64) {
        self.snapshots.lock().unwrap().remove(&job_id);
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<i64> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl SchedulerClient for MockSchedulerClient {
    async fn query_job(&self, job_id: i64) -> Result<Option<JobSnapshot>, SchedulerError> {
        if self.failing_queries.lock().unwrap().contains(&job_id) {
            return Err(SchedulerError::Transport(format!(
                "scripted query failure for job {job_id}"
            )));
        }
        Ok(self.snapshots.lock().unwrap().get(&job_id).cloned())
    }

    async fn query_by_state(
        &self,
        state: SlurmState,
    ) -> Result<Vec<JobSnapshot>, SchedulerError> {
        let mut jobs: Vec<JobSnapshot> = self
            .snapshots
            .lock()
            .unwrap()
            .values()
            .filter(|snapshot| snapshot.state == state)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        Ok(jobs)
    }

    async fn submit(&self, command: &str) -> Result<i64, SchedulerError> {
        self.submitted.lock().unwrap().push(command.to_string());
        match self.submit_results.lock().unwrap().pop_front() {
            Some(Ok(job_id)) => Ok(job_id),
            Some(Err(message)) => Err(SchedulerError::CommandFailed(message)),
            None => Err(SchedulerError::CommandFailed(
                "no scripted submission result".to_string(),
            )),
        }
    }

    async fn cancel(&self, job_id: i64) -> Result<(), SchedulerError> {
        if self.failing_cancels.lock().unwrap().contains(&job_id) {
            return Err(SchedulerError::CommandFailed(format!(
                "scripted cancel failure for job {job_id}"
            )));
        }
        self.cancelled.lock().unwrap().push(job_id);
        self.snapshots.lock().unwrap().remove(&job_id);
        Ok(())
    }
}

/// One recorded notification.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedNotification {
    pub job_id: i64,
    pub old_state: SlurmState,
    pub new_state: SlurmState,
    pub task: TaskEnvelope,
}

#[derive(Default)]
pub struct SpyNotifier {
    emitted: Mutex<Vec<RecordedNotification>>,
}

impl SpyNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> Vec<RecordedNotification> {
        self.emitted.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.emitted.lock().unwrap().len()
    }

    pub fn has_emitted_for(&self, job_id: i64) -> bool {
        self.emitted
            .lock()
            .unwrap()
            .iter()
            .any(|notification| notification.job_id == job_id)
    }
}

#[async_trait]
impl Notifier for SpyNotifier {
    async fn emit(
        &self,
        job_id: i64,
        old_state: SlurmState,
        new_state: SlurmState,
        task: &TaskEnvelope,
    ) -> Result<()> {
        self.emitted.lock().unwrap().push(RecordedNotification {
            job_id,
            old_state,
            new_state,
            task: task.clone(),
        });
        Ok(())
    }
}
