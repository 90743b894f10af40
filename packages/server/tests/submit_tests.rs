//! Submission endpoint: envelope validation, command dispatch, and
//! registration of the accepted job.

mod common;

use common::{send_json, task_json, Harness};
use proxy_core::kernel::jobs::JobStore;
use proxy_core::kernel::slurm::SlurmState;
use proxy_core::kernel::test_dependencies::MockSchedulerClient;

#[tokio::test]
async fn submit_accepts_a_valid_task_and_tracks_the_job() {
    let harness = Harness::new(
        MockSchedulerClient::new()
            .with_submit_ok(4242)
            .with_job(4242, SlurmState::Pending),
    );
    let task = task_json("echo_hello_world");

    let (status, body) = send_json(
        &harness.app(),
        "POST",
        "/submit/",
        Some(&serde_json::json!({ "task": task })),
    )
    .await;

    assert_eq!(status, 200);
    // The original envelope round-trips to the client.
    assert_eq!(body, task);

    let record = harness.store.find(4242).await.unwrap().unwrap();
    assert_eq!(record.state, SlurmState::Pending);
    assert_eq!(serde_json::to_value(&record.task).unwrap(), task);
}

#[tokio::test]
async fn submit_renders_the_composed_command() {
    let harness = Harness::new(
        MockSchedulerClient::new()
            .with_submit_ok(4242)
            .with_job(4242, SlurmState::Pending),
    );

    send_json(
        &harness.app(),
        "POST",
        "/submit/",
        Some(&serde_json::json!({ "task": task_json("echo_hello_world") })),
    )
    .await;

    let submitted = harness.scheduler.submitted();
    assert_eq!(submitted.len(), 1);
    let command = &submitted[0];
    assert!(command.starts_with("mkdir -p /scratch/in ; mkdir -p /scratch/out ; mkdir -p /scratch/err ; "));
    assert!(command.contains("sbatch --parsable"));
    assert!(command.contains("--output=/scratch/out/hello.out"));
    assert!(command.contains("--error=/scratch/err/hello.err"));
    // The fixture has an empty time limit, so no --time flag at all.
    assert!(!command.contains("--time"));
    assert!(command.ends_with("--wrap='echo hello world'"));
}

#[tokio::test]
async fn submit_round_trips_through_the_status_endpoint() {
    let harness = Harness::new(
        MockSchedulerClient::new()
            .with_submit_ok(4242)
            .with_job(4242, SlurmState::Pending),
    );
    let app = harness.app();
    let task = task_json("echo_hello_world");

    send_json(&app, "POST", "/submit/", Some(&serde_json::json!({ "task": task }))).await;
    let (status, body) = send_json(&app, "GET", "/monitor/slurm_job_id/4242", None).await;

    assert_eq!(status, 200);
    assert_eq!(body["store"]["task"], task);
    assert_eq!(body["scheduler"]["state"], "PENDING");
}

#[tokio::test]
async fn submit_with_unregistered_task_name_is_rejected() {
    let harness = Harness::new(MockSchedulerClient::new());

    let (status, body) = send_json(
        &harness.app(),
        "POST",
        "/submit/",
        Some(&serde_json::json!({ "task": task_json("transcode_video") })),
    )
    .await;

    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("transcode_video"));
    assert!(harness.scheduler.submitted().is_empty());
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn submit_with_missing_envelope_key_is_rejected() {
    let harness = Harness::new(MockSchedulerClient::new());
    let mut task = task_json("echo_hello_world");
    task.as_object_mut().unwrap().remove("dirs");

    let (status, _) = send_json(
        &harness.app(),
        "POST",
        "/submit/",
        Some(&serde_json::json!({ "task": task })),
    )
    .await;

    assert_eq!(status, 400);
    assert!(harness.scheduler.submitted().is_empty());
}

#[tokio::test]
async fn submit_with_unknown_envelope_field_is_rejected() {
    let harness = Harness::new(MockSchedulerClient::new());
    let mut task = task_json("echo_hello_world");
    task["retries"] = serde_json::json!(3);

    let (status, _) = send_json(
        &harness.app(),
        "POST",
        "/submit/",
        Some(&serde_json::json!({ "task": task })),
    )
    .await;

    assert_eq!(status, 400);
}

#[tokio::test]
async fn submit_without_a_task_is_rejected() {
    let harness = Harness::new(MockSchedulerClient::new());

    let (status, _) = send_json(
        &harness.app(),
        "POST",
        "/submit/",
        Some(&serde_json::json!({})),
    )
    .await;

    assert_eq!(status, 400);
}

#[tokio::test]
async fn scheduler_rejection_surfaces_as_bad_request() {
    let harness = Harness::new(
        MockSchedulerClient::new().with_submit_error("sbatch: error: invalid partition"),
    );

    let (status, body) = send_json(
        &harness.app(),
        "POST",
        "/submit/",
        Some(&serde_json::json!({ "task": task_json("echo_hello_world") })),
    )
    .await;

    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("submission failed"));
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn trivially_fast_job_notifies_without_tracking() {
    // The job is already terminal when first observed after submission.
    let harness = Harness::new(
        MockSchedulerClient::new()
            .with_submit_ok(4242)
            .with_job(4242, SlurmState::Completed),
    );

    let (status, _) = send_json(
        &harness.app(),
        "POST",
        "/submit/",
        Some(&serde_json::json!({ "task": task_json("echo_hello_world") })),
    )
    .await;

    assert_eq!(status, 200);
    assert!(harness.store.is_empty());
    let emitted = harness.notifier.emitted();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].job_id, 4242);
    assert_eq!(emitted[0].old_state, SlurmState::Unknown);
    assert_eq!(emitted[0].new_state, SlurmState::Completed);
}
