//! Webhook handler for GitHub check_suite events

use axum::{
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{Instrument, error, info, info_span, warn};

use crate::SharedState;
use crate::dispatch::Submission;
use crate::error::HookError;
use crate::signature::{SIGNATURE_HEADER, verify};
use crate::webhook::{DeliveryInfo, WebhookEvent};

/// Handles `POST /payload`.
///
/// The body arrives as raw bytes and is verified before anything parses it.
/// Once a delivery is authenticated the response is always `200`, unless the
/// body turns out not to be JSON; what happens to the benchmark afterwards
/// is only visible in the logs and the job history.
pub async fn handle_payload(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = DeliveryInfo::from_headers(&headers);
    let span = info_span!(
        "payload",
        delivery = delivery.delivery_id.as_deref().unwrap_or("-"),
        event = delivery.event.as_deref().unwrap_or("-"),
    );

    async move {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        if let Err(reason) = verify(&body, signature, state.secret.as_bytes()).into_result() {
            warn!("Rejected delivery: {}", reason);
            return HookError::from(reason).into_response();
        }

        let event = match WebhookEvent::from_slice(&body) {
            Ok(event) => event,
            Err(e) => {
                warn!("Could not parse JSON body: {}", e);
                return HookError::from(e).into_response();
            }
        };

        match state.dispatcher.submit(&event, delivery.delivery_id).await {
            Ok(submission) => acknowledge(submission),
            Err(e @ HookError::MalformedEvent(_)) => {
                error!("Not dispatching: {}", e);
                e.into_response()
            }
            Err(e) => {
                error!("Dispatch failed after the delivery was accepted: {}", e);
                (
                    StatusCode::OK,
                    "Request body was signed; the benchmark could not be started",
                )
                    .into_response()
            }
        }
    }
    .instrument(span)
    .await
}

fn acknowledge(submission: Submission) -> Response {
    let message = match submission {
        Submission::Skipped { action } => {
            info!("Ignoring action {:?}", action);
            "Request body was signed; event does not trigger a benchmark".to_string()
        }
        Submission::Started { job_id, commit_sha } => {
            info!("Job {} queued for commit {}", job_id, commit_sha);
            received(&commit_sha)
        }
        Submission::Finished {
            commit_sha,
            success,
            summary,
            ..
        } => {
            let verdict = if success { "finished" } else { "failed" };
            format!("{}; benchmark {} ({})", received(&commit_sha), verdict, summary)
        }
        Submission::StillRunning { commit_sha, .. } => {
            format!("{}; benchmark still running", received(&commit_sha))
        }
    };
    (StatusCode::OK, message).into_response()
}

fn received(commit_sha: &str) -> String {
    format!(
        "Received a request for the commit {} and request body was signed",
        commit_sha
    )
}
