//! Application setup and router assembly.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::{header::CONTENT_TYPE, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::routes::{
    by_state_handler, delete_handler, health_handler, ping_handler, register_handler,
    status_handler, submit_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<ServerDeps>,
}

/// Build the Axum application router
pub fn build_app(deps: Arc<ServerDeps>) -> Router {
    let state = AppState { deps };

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/submit/", post(submit_handler))
        .route("/monitor/", post(register_handler))
        .route(
            "/monitor/slurm_job_id/:job_id",
            get(status_handler).delete(delete_handler),
        )
        .route("/monitor/slurm_state/:state", get(by_state_handler))
        .route("/ping", get(ping_handler))
        .route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
