//! Scheduler client abstraction.
//!
//! Everything that talks to SLURM goes through the [`SchedulerClient`]
//! capability trait: one implementation runs commands over a remote shell
//! channel ([`ssh::SshSchedulerClient`]), the other talks to a slurmrestd
//! endpoint ([`rest::RestSchedulerClient`]). The choice is made by
//! configuration at startup; nothing else in the crate knows which backend
//! is in play.

pub mod rest;
pub mod sbatch;
pub mod ssh;
pub mod state;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use state::{SlurmState, StateInfo, STATE_TABLE};

/// Sentinel returned by the original proxy for a failed submission. Kept as
/// a guard value: a parsed job id must be non-negative and never this.
pub const BAD_JOB_ID: i64 = -1;

/// Reserved job id that short-circuits `query_job` with a synthetic
/// snapshot, without touching the network.
pub const TEST_JOB_ID: i64 = 123;

/// Accounting fields requested from sacct, in wire order.
pub const SACCT_FORMAT: &str =
    "JobID,JobName%-128,State,User,Partition,TimeLimit,Start,End,Elapsed";

/// One parsed accounting record.
///
/// All fields except `state` are carried verbatim from the scheduler;
/// `state` is classified before the snapshot leaves this module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: String,
    pub job_name: String,
    pub state: SlurmState,
    pub user: String,
    pub partition: String,
    pub time_limit: String,
    pub start: String,
    pub end: String,
    pub elapsed: String,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The channel to the scheduler host could not be established or died
    /// mid-command (after the one reconnect retry).
    #[error("scheduler transport failure: {0}")]
    Transport(String),

    /// The remote command ran but reported failure (non-zero exit, or
    /// stderr output from a submission).
    #[error("scheduler command failed: {0}")]
    CommandFailed(String),

    /// The scheduler answered with something we could not parse.
    #[error("unparseable scheduler response: {0}")]
    Parse(String),
}

/// Capability interface to the batch scheduler.
#[async_trait]
pub trait SchedulerClient: Send + Sync {
    /// Look up the current accounting record for a job. `None` means the
    /// scheduler no longer (or never) knew the id.
    async fn query_job(&self, job_id: i64) -> Result<Option<JobSnapshot>, SchedulerError>;

    /// All accounting records currently in the given state.
    async fn query_by_state(&self, state: SlurmState)
        -> Result<Vec<JobSnapshot>, SchedulerError>;

    /// Dispatch a rendered submission command; returns the scheduler-assigned
    /// job id.
    async fn submit(&self, command: &str) -> Result<i64, SchedulerError>;

    /// Cancel a job. Ok iff the scheduler accepted the cancellation.
    async fn cancel(&self, job_id: i64) -> Result<(), SchedulerError>;
}

/// The fixed snapshot served for [`TEST_JOB_ID`].
pub fn test_job_snapshot() -> JobSnapshot {
    JobSnapshot {
        job_id: TEST_JOB_ID.to_string(),
        job_name: "abcd1234".to_string(),
        state: SlurmState::Completed,
        user: "username".to_string(),
        partition: "partition".to_string(),
        time_limit: "UNLIMITED".to_string(),
        start: "2025-04-14T08:57:46".to_string(),
        end: "2025-04-14T11:00:44".to_string(),
        elapsed: "02:02:58".to_string(),
    }
}

/// Test-sentinel override shared by the real backends.
pub(crate) fn test_override(job_id: i64) -> Option<JobSnapshot> {
    (job_id == TEST_JOB_ID).then(test_job_snapshot)
}

/// Parse one pipe-delimited sacct record. Missing trailing fields read as
/// empty; the state token is classified, never stored raw.
pub fn parse_sacct_record(line: &str) -> JobSnapshot {
    let mut fields = line.split('|');
    let mut next = || fields.next().unwrap_or("").trim().to_string();
    let job_id = next();
    let job_name = next();
    let state = SlurmState::classify(&next());
    JobSnapshot {
        job_id,
        job_name,
        state,
        user: next(),
        partition: next(),
        time_limit: next(),
        start: next(),
        end: next(),
        elapsed: next(),
    }
}

/// Parse a whole sacct response body: one record per non-empty line, empty
/// body means the scheduler has nothing to say.
pub fn parse_sacct_output(output: &str) -> Vec<JobSnapshot> {
    output
        .trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_sacct_record)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str =
        "4242|align_reads|RUNNING|areynolds|queue0|12:00:00|2025-04-14T08:57:46|Unknown|00:41:12";

    #[test]
    fn parses_a_full_record() {
        let snap = parse_sacct_record(RECORD);
        assert_eq!(snap.job_id, "4242");
        assert_eq!(snap.job_name, "align_reads");
        assert_eq!(snap.state, SlurmState::Running);
        assert_eq!(snap.user, "areynolds");
        assert_eq!(snap.partition, "queue0");
        assert_eq!(snap.time_limit, "12:00:00");
        assert_eq!(snap.elapsed, "00:41:12");
    }

    #[test]
    fn unrecognized_state_becomes_unknown() {
        let snap = parse_sacct_record("77|x|OUT_OF_MEMORY|u|p|1:00|s|e|el");
        assert_eq!(snap.state, SlurmState::Unknown);
    }

    #[test]
    fn short_record_reads_empty_trailing_fields() {
        let snap = parse_sacct_record("99|name|PENDING");
        assert_eq!(snap.job_id, "99");
        assert_eq!(snap.state, SlurmState::Pending);
        assert_eq!(snap.partition, "");
        assert_eq!(snap.elapsed, "");
    }

    #[test]
    fn empty_output_parses_to_no_records() {
        assert!(parse_sacct_output("").is_empty());
        assert!(parse_sacct_output("  \n \n").is_empty());
    }

    #[test]
    fn multi_line_output_keeps_order() {
        let body = format!("{RECORD}\n100|b|COMPLETED|u|p|t|s|e|el\n");
        let snaps = parse_sacct_output(&body);
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].job_id, "4242");
        assert_eq!(snaps[1].state, SlurmState::Completed);
    }

    #[test]
    fn sentinel_bypasses_the_backend() {
        let snap = test_override(TEST_JOB_ID).unwrap();
        assert_eq!(snap.state, SlurmState::Completed);
        assert_eq!(snap.job_id, "123");
        assert!(test_override(124).is_none());
    }
}
