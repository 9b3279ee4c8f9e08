mod common;

use std::time::Duration;

use bench_hook::config::DispatchMode;
use bench_hook::error::FORBIDDEN_MESSAGE;
use bench_hook::signature::sign;
use common::{COMPLETED_BODY, SECRET, TestApp, payload, signed_payload};

#[tokio::test]
async fn signed_completed_event_runs_benchmark_once() {
    let mut app = TestApp::background();

    let (status, body) = app.send(signed_payload(COMPLETED_BODY)).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        "Received a request for the commit abc123 and request body was signed"
    );

    assert_eq!(app.next_invocation().await, "abc123");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(app.runner.calls(), vec!["abc123"]);

    let jobs = app.dispatcher.recent_jobs(10).await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].commit_sha, "abc123");
    assert_eq!(
        jobs[0].delivery_id.as_deref(),
        Some("72d3162e-cc78-11e3-81ab-4c9367dc0958")
    );
}

#[tokio::test]
async fn wrong_signature_is_forbidden_and_runs_nothing() {
    let app = TestApp::background();
    let forged = sign(b"not the secret", COMPLETED_BODY.as_bytes());

    let (status, body) = app.send(payload(COMPLETED_BODY, Some(&forged))).await;
    assert_eq!(status, 403);
    assert_eq!(body, FORBIDDEN_MESSAGE);
    assert!(!body.contains("sha256"));

    let expected = sign(SECRET.as_bytes(), COMPLETED_BODY.as_bytes());
    assert!(!body.contains(&expected[7..]));
    assert!(app.runner.calls().is_empty());
    assert!(app.dispatcher.recent_jobs(10).await.is_empty());
}

#[tokio::test]
async fn missing_signature_is_forbidden() {
    let app = TestApp::background();

    let (status, body) = app.send(payload(COMPLETED_BODY, None)).await;
    assert_eq!(status, 403);
    assert_eq!(body, FORBIDDEN_MESSAGE);
    assert!(app.runner.calls().is_empty());
}

#[tokio::test]
async fn empty_body_is_forbidden_even_when_signed() {
    let app = TestApp::background();

    let (status, _) = app.send(signed_payload("")).await;
    assert_eq!(status, 403);
    assert!(app.runner.calls().is_empty());
}

#[tokio::test]
async fn signature_covers_the_exact_bytes_sent() {
    let mut app = TestApp::background();
    let pretty = "{\n  \"action\" : \"completed\",\n  \"check_suite\": {\"head_commit\": {\"id\": \"f00d\"}}\n}";

    let (status, _) = app.send(signed_payload(pretty)).await;
    assert_eq!(status, 200);
    assert_eq!(app.next_invocation().await, "f00d");

    // Signed over the compact form, delivered pretty-printed.
    let compact = r#"{"action":"completed","check_suite":{"head_commit":{"id":"f00d"}}}"#;
    let signature = sign(SECRET.as_bytes(), compact.as_bytes());
    let (status, _) = app.send(payload(pretty, Some(&signature))).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn other_actions_are_acknowledged_without_running() {
    let app = TestApp::background();

    for body in [
        r#"{"action":"requested","check_suite":{"head_commit":{"id":"abc123"}}}"#,
        r#"{"action":"rerequested"}"#,
        r#"{"zen":"Keep it logically awesome.","hook_id":1}"#,
        r#"[1,2,3]"#,
    ] {
        let (status, body) = app.send(signed_payload(body)).await;
        assert_eq!(status, 200);
        assert!(body.contains("does not trigger a benchmark"));
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(app.runner.calls().is_empty());
}

#[tokio::test]
async fn completed_without_commit_is_acknowledged_but_not_run() {
    let app = TestApp::background();

    for body in [
        r#"{"action":"completed"}"#,
        r#"{"action":"completed","check_suite":{"head_commit":null}}"#,
        r#"{"action":"completed","check_suite":{"head_commit":{"id":""}}}"#,
    ] {
        let (status, body) = app.send(signed_payload(body)).await;
        assert_eq!(status, 200);
        assert!(body.contains("names no commit"));
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(app.runner.calls().is_empty());
}

#[tokio::test]
async fn signed_non_json_is_bad_request() {
    let app = TestApp::background();

    let (status, _) = app.send(signed_payload("payload=%7B%7D")).await;
    assert_eq!(status, 400);
    assert!(app.runner.calls().is_empty());
}

#[tokio::test]
async fn redelivery_runs_again() {
    let mut app = TestApp::background();

    for _ in 0..2 {
        let (status, _) = app.send(signed_payload(COMPLETED_BODY)).await;
        assert_eq!(status, 200);
        assert_eq!(app.next_invocation().await, "abc123");
    }
    assert_eq!(app.runner.calls(), vec!["abc123", "abc123"]);
}

#[tokio::test]
async fn hostile_commit_id_is_passed_through_verbatim() {
    let mut app = TestApp::background();
    let body = r#"{"action":"completed","check_suite":{"head_commit":{"id":"abc; rm -rf / #"}}}"#;

    let (status, _) = app.send(signed_payload(body)).await;
    assert_eq!(status, 200);
    assert_eq!(app.next_invocation().await, "abc; rm -rf / #");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = TestApp::background();
    let body = format!(
        r#"{{"action":"completed","padding":"{}"}}"#,
        "x".repeat(128 * 1024)
    );

    let (status, _) = app.send(signed_payload(&body)).await;
    assert_eq!(status, 413);
    assert!(app.runner.calls().is_empty());
}

#[tokio::test]
async fn inline_mode_reports_the_finished_run() {
    let mut app = TestApp::new(DispatchMode::Inline {
        timeout: Duration::from_secs(5),
    });

    let (status, body) = app.send(signed_payload(COMPLETED_BODY)).await;
    assert_eq!(status, 200);
    assert!(body.starts_with("Received a request for the commit abc123"));
    assert!(body.contains("benchmark finished"));
    assert!(!body.contains("benchmarked abc123"));
    assert_eq!(app.next_invocation().await, "abc123");
}
