#![allow(dead_code)]

// Common test utilities: a dependency harness wired with mocks, an
// in-memory store, and helpers for driving the router.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use proxy_core::kernel::jobs::testing::InMemoryJobStore;
use proxy_core::kernel::jobs::{JobStore, TaskEnvelope, TrackedJob};
use proxy_core::kernel::slurm::SlurmState;
use proxy_core::kernel::test_dependencies::{MockSchedulerClient, SpyNotifier};
use proxy_core::kernel::{ServerDeps, TaskRegistry};
use proxy_core::server::build_app;

pub struct Harness {
    pub deps: Arc<ServerDeps>,
    pub store: Arc<InMemoryJobStore>,
    pub scheduler: Arc<MockSchedulerClient>,
    pub notifier: Arc<SpyNotifier>,
}

impl Harness {
    pub fn new(scheduler: MockSchedulerClient) -> Self {
        Self::with_store(scheduler, InMemoryJobStore::new())
    }

    pub fn with_store(scheduler: MockSchedulerClient, store: InMemoryJobStore) -> Self {
        let store = Arc::new(store);
        let scheduler = Arc::new(scheduler);
        let notifier = Arc::new(SpyNotifier::new());
        let deps = Arc::new(ServerDeps::new(
            Arc::clone(&store) as Arc<dyn JobStore>,
            scheduler.clone(),
            notifier.clone(),
            Arc::new(TaskRegistry::builtin()),
        ));
        Self {
            deps,
            store,
            scheduler,
            notifier,
        }
    }

    pub fn app(&self) -> Router {
        build_app(Arc::clone(&self.deps))
    }
}

/// The S1 task envelope as JSON.
pub fn task_json(name: &str) -> Value {
    serde_json::json!({
        "name": name,
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

pub fn task_envelope(name: &str) -> TaskEnvelope {
    serde_json::from_value(task_json(name)).expect("fixture envelope is valid")
}

pub fn tracked(job_id: i64, state: SlurmState) -> TrackedJob {
    TrackedJob::new(job_id, state, task_envelope("echo_hello_world"))
}

/// Drive one request through the router; the response body comes back raw.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<&Value>,
) -> (StatusCode, Vec<u8>) {
    let request = match body {
        Some(value) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .expect("request builds"),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request builds"),
    };
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router never errors");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body is readable");
    (status, bytes.to_vec())
}

/// Drive one request and parse the JSON response body.
pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<&Value>,
) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}
