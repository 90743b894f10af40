//! Translation of service errors into HTTP responses.
//!
//! Validation problems are 400s, unknown jobs are 404s, scheduler or
//! store failures outside the submit path are 500s. Bodies are always
//! `{"error": …}`, optionally with extra diagnostic fields.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::kernel::jobs::monitor::MonitorError;
use crate::kernel::jobs::submit::SubmitError;
use crate::kernel::jobs::StoreError;
use crate::kernel::slurm::STATE_TABLE;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            details: None,
        }
    }

    /// 400 for an unrecognized state name, with the reference table of
    /// known states attached.
    pub fn unknown_state(raw: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: format!("{raw:?} is not a known job state"),
            details: Some(json!({
                "known_states": STATE_TABLE
                    .iter()
                    .map(|info| json!({
                        "state": info.state,
                        "code": info.code,
                        "explanation": info.explanation,
                    }))
                    .collect::<Vec<_>>(),
            })),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.message });
        if let Some(details) = self.details {
            if let (Some(map), Some(extra)) = (body.as_object_mut(), details.as_object()) {
                map.extend(extra.clone());
            }
        }
        (self.status, Json(body)).into_response()
    }
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::UnknownToScheduler(_) => Self::validation(err.to_string()),
            MonitorError::NotFound(_) | MonitorError::NotTracked(_) => {
                Self::not_found(err.to_string())
            }
            MonitorError::CancelFailed(..) => Self::validation(err.to_string()),
            MonitorError::Scheduler(_) | MonitorError::Store(_) => {
                tracing::error!(error = %err, "monitor operation failed");
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        // Every submit failure is the client's 400, per the submission
        // contract; the body says why.
        Self::validation(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "store operation failed");
        Self::internal(err.to_string())
    }
}
