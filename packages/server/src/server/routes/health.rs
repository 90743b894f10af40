use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::kernel::jobs::JobStore;
use crate::server::app::AppState;

/// Liveness probe.
pub async fn ping_handler() -> &'static str {
    "pong"
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    store: StoreHealth,
}

#[derive(Serialize)]
pub struct StoreHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tracked_jobs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Verifies the job store answers within a bounded time. Returns 200 OK
/// when healthy, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let store_health = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        state.deps.store.all(),
    )
    .await
    {
        Ok(Ok(jobs)) => StoreHealth {
            status: "ok".to_string(),
            tracked_jobs: Some(jobs.len()),
            error: None,
        },
        Ok(Err(e)) => StoreHealth {
            status: "error".to_string(),
            tracked_jobs: None,
            error: Some(format!("Query failed: {}", e)),
        },
        Err(_) => StoreHealth {
            status: "error".to_string(),
            tracked_jobs: None,
            error: Some("Query timeout (>5s)".to_string()),
        },
    };

    let is_healthy = store_health.status == "ok";
    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            store: store_health,
        }),
    )
}
