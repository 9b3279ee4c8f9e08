pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod job;
pub mod logging;
pub mod runner;
pub mod signature;
pub mod webhook;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::{Router, routing};
use chrono::{DateTime, Utc};

use config::WebhookSecret;
use dispatch::Dispatcher;

/// State shared by every request handler. Nothing in here is mutated after
/// startup except the job history inside the dispatcher.
pub struct AppState {
    pub secret: WebhookSecret,
    pub dispatcher: Arc<Dispatcher>,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(secret: WebhookSecret, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            secret,
            dispatcher,
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Builds the HTTP surface. Bodies above `max_body_bytes` are refused with 413.
pub fn router(state: SharedState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", routing::get(api::root))
        .route("/payload", routing::post(api::handle_payload))
        .route("/status", routing::get(api::status))
        .route("/job/{id}", routing::get(api::get_job))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}
