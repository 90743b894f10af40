//! In-memory `JobStore` for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::job::TrackedJob;
use super::store::{JobStore, StoreError};
use crate::kernel::slurm::SlurmState;

/// Map-backed store with the same contract as the Postgres implementation.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<BTreeMap<i64, TrackedJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs(jobs: impl IntoIterator<Item = TrackedJob>) -> Self {
        let store = Self::new();
        {
            let mut map = store.jobs.lock().unwrap();
            for job in jobs {
                map.insert(job.job_id, job);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, job_id: i64) -> bool {
        self.jobs.lock().unwrap().contains_key(&job_id)
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: &TrackedJob) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(&job.job_id) {
            return Ok(false);
        }
        jobs.insert(job.job_id, job.clone());
        Ok(true)
    }

    async fn find(&self, job_id: i64) -> Result<Option<TrackedJob>, StoreError> {
        Ok(self.jobs.lock().unwrap().get(&job_id).cloned())
    }

    async fn update_state(&self, job_id: i64, state: SlurmState) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(&job_id) {
            Some(job) if job.state != state => {
                job.state = state;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, job_id: i64) -> Result<bool, StoreError> {
        Ok(self.jobs.lock().unwrap().remove(&job_id).is_some())
    }

    async fn take(&self, job_id: i64) -> Result<Option<TrackedJob>, StoreError> {
        Ok(self.jobs.lock().unwrap().remove(&job_id))
    }

    async fn all(&self) -> Result<Vec<TrackedJob>, StoreError> {
        Ok(self.jobs.lock().unwrap().values().cloned().collect())
    }
}
