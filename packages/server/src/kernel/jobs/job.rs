//! Tracked-job record and the typed task envelope.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kernel::slurm::SlurmState;

/// A job under active monitoring: exactly one row per scheduler job id.
///
/// The record exists iff the scheduler accepted the id and its last
/// observed state was non-terminal. The envelope is preserved verbatim
/// from submission and travels with queries and notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedJob {
    pub job_id: i64,
    pub state: SlurmState,
    pub task: TaskEnvelope,
}

impl TrackedJob {
    pub fn new(job_id: i64, state: SlurmState, task: TaskEnvelope) -> Self {
        Self {
            job_id,
            state,
            task,
        }
    }
}

/// The client-supplied task envelope, validated at the HTTP boundary.
/// Unknown fields are rejected; `params` stay opaque — the registered
/// command owns their interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskEnvelope {
    pub name: String,
    pub params: Vec<String>,
    pub uuid: Uuid,
    pub slurm: SlurmDirectives,
    pub dirs: TaskDirs,
}

/// Scheduling directives passed through to sbatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlurmDirectives {
    pub job_name: String,
    /// Output file name, joined against `dirs.output`.
    pub output: String,
    /// Error file name, joined against `dirs.error`.
    pub error: String,
    pub nodes: u32,
    pub mem: String,
    pub cpus_per_task: u32,
    pub ntasks_per_node: u32,
    pub partition: String,
    /// Wall-clock limit; empty means no `--time` flag at all.
    pub time: String,
}

/// Scheduler-visible directories created before submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDirs {
    pub input: String,
    pub output: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope_json() -> serde_json::Value {
        serde_json::json!({
            "name": "echo_hello_world",
            "params": ["hello", "world"],
            "uuid": "123e4567-e89b-12d3-a456-426614174000",
            "slurm": {
                "job_name": "hello",
                "output": "hello.out",
                "error": "hello.err",
                "nodes": 1,
                "mem": "4G",
                "cpus_per_task": 2,
                "ntasks_per_node": 1,
                "partition": "queue0",
                "time": ""
            },
            "dirs": {
                "input": "/scratch/in",
                "output": "/scratch/out",
                "error": "/scratch/err"
            }
        })
    }

    #[test]
    fn envelope_round_trips() {
        let task: TaskEnvelope = serde_json::from_value(envelope_json()).unwrap();
        assert_eq!(task.name, "echo_hello_world");
        assert_eq!(task.params, vec!["hello", "world"]);
        assert_eq!(task.slurm.nodes, 1);
        let back = serde_json::to_value(&task).unwrap();
        assert_eq!(back, envelope_json());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut value = envelope_json();
        value["retries"] = serde_json::json!(3);
        assert!(serde_json::from_value::<TaskEnvelope>(value).is_err());
    }

    #[test]
    fn missing_required_key_is_rejected() {
        let mut value = envelope_json();
        value.as_object_mut().unwrap().remove("slurm");
        assert!(serde_json::from_value::<TaskEnvelope>(value).is_err());
    }
}
