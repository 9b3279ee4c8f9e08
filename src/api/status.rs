//! Read-only endpoints for checking on the service and its jobs

use axum::{
    Json,
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::SharedState;
use crate::config::DispatchMode;

const RECENT_JOBS: usize = 10;

/// Root health check endpoint
pub async fn root() -> &'static str {
    "bench_hook - healthy"
}

/// Server info and the most recent jobs, newest first
pub async fn status(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    let jobs = state.dispatcher.recent_jobs(RECENT_JOBS).await;
    let mode = match state.dispatcher.mode() {
        DispatchMode::Background => json!({ "mode": "background" }),
        DispatchMode::Inline { timeout } => json!({
            "mode": "inline",
            "timeout_secs": timeout.as_secs(),
        }),
    };

    Json(json!({
        "server": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "started_at": state.started_at,
            "uptime_seconds": state.start_time.elapsed().as_secs(),
        },
        "dispatch": mode,
        "jobs": {
            "recent": jobs,
            "recent_count": jobs.len(),
        }
    }))
}

/// A single job record by id
pub async fn get_job(
    AxumState(state): AxumState<SharedState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.dispatcher.get_job(&id).await {
        Some(job) => Json(job).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Job {} not found", id) })),
        )
            .into_response(),
    }
}
