//! REST scheduler backend (slurmrestd-style).
//!
//! The alternative to the shell channel: submission posts the rendered
//! command as a batch script, queries read the accounting endpoint, and
//! cancellation is a DELETE. Selected with `SUBMIT_BACKEND=rest`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    test_override, JobSnapshot, SchedulerClient, SchedulerError, SlurmState,
};

const API_VERSION: &str = "v0.0.40";

#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL of the slurmrestd endpoint, e.g. `http://scheduler:6820`.
    pub base_url: String,
    pub user_name: String,
    pub token: String,
}

pub struct RestSchedulerClient {
    config: RestConfig,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    script: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: i64,
}

/// Accounting record as the REST endpoint reports it.
#[derive(Debug, Deserialize)]
struct RestJob {
    job_id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    partition: String,
    #[serde(default)]
    time_limit: String,
    #[serde(default)]
    start: String,
    #[serde(default)]
    end: String,
    #[serde(default)]
    elapsed: String,
}

#[derive(Debug, Deserialize)]
struct JobsResponse {
    #[serde(default)]
    jobs: Vec<RestJob>,
}

fn snapshot_from_rest(job: RestJob) -> JobSnapshot {
    JobSnapshot {
        job_id: job.job_id.to_string(),
        job_name: job.name,
        state: SlurmState::classify(&job.state),
        user: job.user,
        partition: job.partition,
        time_limit: job.time_limit,
        start: job.start,
        end: job.end,
        elapsed: job.elapsed,
    }
}

fn transport(err: reqwest::Error) -> SchedulerError {
    SchedulerError::Transport(err.to_string())
}

impl RestSchedulerClient {
    pub fn new(config: RestConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, tail: &str) -> String {
        format!(
            "{}/{tail}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("X-SLURM-USER-NAME", &self.config.user_name)
            .header("X-SLURM-USER-TOKEN", &self.config.token)
    }
}

#[async_trait]
impl SchedulerClient for RestSchedulerClient {
    async fn query_job(&self, job_id: i64) -> Result<Option<JobSnapshot>, SchedulerError> {
        if let Some(snapshot) = test_override(job_id) {
            return Ok(Some(snapshot));
        }
        let url = self.url(&format!("slurmdb/{API_VERSION}/job/{job_id}"));
        let response = self.authed(self.http.get(url)).send().await.map_err(transport)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SchedulerError::CommandFailed(format!(
                "accounting query returned {}",
                response.status()
            )));
        }
        let body: JobsResponse = response.json().await.map_err(|err| {
            SchedulerError::Parse(format!("accounting response: {err}"))
        })?;
        Ok(body.jobs.into_iter().next().map(snapshot_from_rest))
    }

    async fn query_by_state(
        &self,
        state: SlurmState,
    ) -> Result<Vec<JobSnapshot>, SchedulerError> {
        let url = self.url(&format!("slurmdb/{API_VERSION}/jobs?state={state}"));
        let response = self.authed(self.http.get(url)).send().await.map_err(transport)?;
        if !response.status().is_success() {
            return Err(SchedulerError::CommandFailed(format!(
                "accounting query returned {}",
                response.status()
            )));
        }
        let body: JobsResponse = response.json().await.map_err(|err| {
            SchedulerError::Parse(format!("accounting response: {err}"))
        })?;
        Ok(body.jobs.into_iter().map(snapshot_from_rest).collect())
    }

    async fn submit(&self, command: &str) -> Result<i64, SchedulerError> {
        let script = format!("#!/bin/bash\n{command}\n");
        let url = self.url(&format!("slurm/{API_VERSION}/job/submit"));
        let response = self
            .authed(self.http.post(url))
            .json(&SubmitRequest { script: &script })
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SchedulerError::CommandFailed(format!(
                "submission returned {status}: {body}"
            )));
        }
        let body: SubmitResponse = response.json().await.map_err(|err| {
            SchedulerError::Parse(format!("submission response: {err}"))
        })?;
        if body.job_id < 0 {
            return Err(SchedulerError::Parse(format!(
                "scheduler returned an invalid job id {}",
                body.job_id
            )));
        }
        Ok(body.job_id)
    }

    async fn cancel(&self, job_id: i64) -> Result<(), SchedulerError> {
        let url = self.url(&format!("slurm/{API_VERSION}/job/{job_id}"));
        let response = self
            .authed(self.http.delete(url))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(SchedulerError::CommandFailed(format!(
                "cancellation returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_record_maps_to_a_snapshot() {
        let job: RestJob = serde_json::from_value(serde_json::json!({
            "job_id": 4242,
            "name": "align_reads",
            "state": "RUNNING",
            "user": "areynolds",
            "partition": "queue0",
            "time_limit": "12:00:00",
            "start": "2025-04-14T08:57:46",
            "end": "Unknown",
            "elapsed": "00:41:12"
        }))
        .unwrap();
        let snap = snapshot_from_rest(job);
        assert_eq!(snap.job_id, "4242");
        assert_eq!(snap.state, SlurmState::Running);
        assert_eq!(snap.partition, "queue0");
    }

    #[test]
    fn rest_state_tokens_are_classified() {
        let job: RestJob =
            serde_json::from_value(serde_json::json!({ "job_id": 7, "state": "NODE_FAIL" }))
                .unwrap();
        assert_eq!(snapshot_from_rest(job).state, SlurmState::Unknown);
    }
}
