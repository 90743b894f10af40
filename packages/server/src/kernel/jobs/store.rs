//! Durable store of tracked jobs.
//!
//! The trait carries the exact CRUD contract the reconciler and the HTTP
//! handlers rely on; the Postgres implementation enforces id uniqueness at
//! the storage layer, so two requests racing to register the same job id
//! resolve to exactly one row.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use super::job::{TaskEnvelope, TrackedJob};
use crate::kernel::slurm::SlurmState;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored record for job {job_id} is malformed: {source}")]
    Malformed {
        job_id: i64,
        #[source]
        source: serde_json::Error,
    },
}

/// Tracked-job persistence.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a record; `false` when the id is already present.
    async fn insert(&self, job: &TrackedJob) -> Result<bool, StoreError>;

    async fn find(&self, job_id: i64) -> Result<Option<TrackedJob>, StoreError>;

    /// Update the stored state; `false` when the record is missing or the
    /// state is unchanged.
    async fn update_state(&self, job_id: i64, state: SlurmState) -> Result<bool, StoreError>;

    /// Remove a record; `false` when nothing was there.
    async fn delete(&self, job_id: i64) -> Result<bool, StoreError>;

    /// Atomic find-and-delete.
    async fn take(&self, job_id: i64) -> Result<Option<TrackedJob>, StoreError>;

    /// Snapshot of all records. Not a consistent cut, but never a torn
    /// record.
    async fn all(&self) -> Result<Vec<TrackedJob>, StoreError>;
}

/// Postgres-backed store over the `tracked_jobs` table.
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TrackedJobRow {
    job_id: i64,
    state: String,
    task: serde_json::Value,
}

impl TrackedJobRow {
    fn into_job(self) -> Result<TrackedJob, StoreError> {
        let task: TaskEnvelope =
            serde_json::from_value(self.task).map_err(|source| StoreError::Malformed {
                job_id: self.job_id,
                source,
            })?;
        Ok(TrackedJob {
            job_id: self.job_id,
            state: SlurmState::classify(&self.state),
            task,
        })
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, job: &TrackedJob) -> Result<bool, StoreError> {
        let task = serde_json::to_value(&job.task).map_err(|source| StoreError::Malformed {
            job_id: job.job_id,
            source,
        })?;
        let result = sqlx::query(
            r#"
            INSERT INTO tracked_jobs (job_id, state, task)
            VALUES ($1, $2, $3)
            ON CONFLICT (job_id) DO NOTHING
            "#,
        )
        .bind(job.job_id)
        .bind(job.state.as_str())
        .bind(task)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, job_id: i64) -> Result<Option<TrackedJob>, StoreError> {
        let row = sqlx::query_as::<_, TrackedJobRow>(
            r#"
            SELECT job_id, state, task
            FROM tracked_jobs
            WHERE job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TrackedJobRow::into_job).transpose()
    }

    async fn update_state(&self, job_id: i64, state: SlurmState) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tracked_jobs
            SET state = $2, updated_at = NOW()
            WHERE job_id = $1 AND state <> $2
            "#,
        )
        .bind(job_id)
        .bind(state.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, job_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tracked_jobs WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn take(&self, job_id: i64) -> Result<Option<TrackedJob>, StoreError> {
        let row = sqlx::query_as::<_, TrackedJobRow>(
            r#"
            DELETE FROM tracked_jobs
            WHERE job_id = $1
            RETURNING job_id, state, task
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TrackedJobRow::into_job).transpose()
    }

    async fn all(&self) -> Result<Vec<TrackedJob>, StoreError> {
        let rows = sqlx::query_as::<_, TrackedJobRow>(
            r#"
            SELECT job_id, state, task
            FROM tracked_jobs
            ORDER BY job_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TrackedJobRow::into_job).collect()
    }
}
