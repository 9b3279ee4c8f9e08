use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Plain-text body sent back for every failed signature check.
/// Kept fixed so nothing about the computed digest reaches the sender.
pub const FORBIDDEN_MESSAGE: &str = "Request body was not signed or verification failed";

pub const MALFORMED_EVENT_MESSAGE: &str =
    "Request body was signed, but the event names no commit; nothing to run";

/// Custom error type for bench_hook operations
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Authentication failed: {0}")]
    Authentication(#[from] crate::signature::Rejection),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl IntoResponse for HookError {
    fn into_response(self) -> Response {
        match self {
            HookError::Authentication(_) => {
                (StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE).into_response()
            }
            HookError::Json(_) => {
                (StatusCode::BAD_REQUEST, "Request body is not valid JSON").into_response()
            }
            // The sender controls this data and retrying won't fix it.
            HookError::MalformedEvent(_) => {
                (StatusCode::OK, MALFORMED_EVENT_MESSAGE).into_response()
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response(),
        }
    }
}

/// Helper type for Results that use HookError
pub type Result<T> = std::result::Result<T, HookError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Rejection;

    #[test]
    fn authentication_errors_map_to_forbidden() {
        let response = HookError::from(Rejection::Mismatch).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn json_errors_map_to_bad_request() {
        let err = serde_json::from_slice::<serde_json::Value>(b"{not json").unwrap_err();
        let response = HookError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn malformed_events_are_acknowledged() {
        let response = HookError::MalformedEvent("no commit".into()).into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn dispatch_errors_are_internal() {
        let response = HookError::Dispatch("spawn failed".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
