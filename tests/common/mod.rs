#![allow(dead_code)]

use std::process::ExitStatus;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use bench_hook::config::{DispatchMode, WebhookSecret};
use bench_hook::dispatch::Dispatcher;
use bench_hook::runner::{BenchmarkRunner, DispatchOutcome};
use bench_hook::signature::{SIGNATURE_HEADER, sign};
use bench_hook::{AppState, router};
use http_body_util::BodyExt;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const SECRET: &str = "test-webhook-secret";
pub const COMPLETED_BODY: &str =
    r#"{"action":"completed","check_suite":{"head_commit":{"id":"abc123"}}}"#;

#[cfg(unix)]
fn exited_ok() -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(0)
}

#[cfg(windows)]
fn exited_ok() -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(0)
}

/// Records every commit it is asked to benchmark instead of spawning anything.
pub struct MockRunner {
    calls: Mutex<Vec<String>>,
    notify: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl BenchmarkRunner for MockRunner {
    async fn run(&self, commit_sha: &str) -> DispatchOutcome {
        self.calls.lock().unwrap().push(commit_sha.to_string());
        let _ = self.notify.send(commit_sha.to_string());
        DispatchOutcome {
            status: Some(exited_ok()),
            stdout: format!("benchmarked {}", commit_sha),
            ..DispatchOutcome::default()
        }
    }
}

impl MockRunner {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

pub struct TestApp {
    pub app: Router,
    pub runner: Arc<MockRunner>,
    pub dispatcher: Arc<Dispatcher>,
    invocations: mpsc::UnboundedReceiver<String>,
}

impl TestApp {
    pub fn new(mode: DispatchMode) -> Self {
        let (notify, invocations) = mpsc::unbounded_channel();
        let runner = Arc::new(MockRunner {
            calls: Mutex::new(Vec::new()),
            notify,
        });
        let dispatcher = Arc::new(Dispatcher::new(runner.clone(), mode, 16).exclusive(true));
        let state = Arc::new(AppState::new(
            WebhookSecret::new(SECRET).unwrap(),
            dispatcher.clone(),
        ));
        Self {
            app: router(state, 64 * 1024),
            runner,
            dispatcher,
            invocations,
        }
    }

    pub fn background() -> Self {
        Self::new(DispatchMode::Background)
    }

    pub async fn send(&self, request: Request<Body>) -> (u16, String) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        read(response).await
    }

    /// Waits for the next benchmark invocation.
    pub async fn next_invocation(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(5), self.invocations.recv())
            .await
            .expect("no benchmark invocation within 5s")
            .expect("runner dropped")
    }
}

pub async fn read(response: Response<Body>) -> (u16, String) {
    let status = response.status().as_u16();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub fn signed_payload(body: &str) -> Request<Body> {
    let signature = sign(SECRET.as_bytes(), body.as_bytes());
    payload(body, Some(&signature))
}

pub fn payload(body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/payload")
        .header("content-type", "application/json")
        .header("X-GitHub-Event", "check_suite")
        .header("X-GitHub-Delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
