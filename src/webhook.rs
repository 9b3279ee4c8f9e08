//! Reads the fields of a GitHub `check_suite` delivery that decide whether
//! a benchmark runs, plus the delivery headers used for log context.

/// Only this `action` value triggers a benchmark run.
pub const QUALIFYING_ACTION: &str = "completed";

/// The fields of a `check_suite` delivery that decide whether to act.
///
/// Everything else in the payload is ignored, and a field of the wrong type
/// reads as absent rather than failing the parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookEvent {
    pub action: Option<String>,
    pub commit_id: Option<String>,
}

impl WebhookEvent {
    pub fn new(action: Option<&str>, commit_id: Option<&str>) -> Self {
        Self {
            action: action.map(String::from),
            commit_id: commit_id.map(String::from),
        }
    }

    /// Parses the raw body. Fails only if the bytes are not JSON.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        let payload: serde_json::Value = serde_json::from_slice(body)?;
        Ok(Self::from_value(&payload))
    }

    pub fn from_value(payload: &serde_json::Value) -> Self {
        let action = payload
            .get("action")
            .and_then(|v| v.as_str())
            .map(String::from);
        let commit_id = payload
            .get("check_suite")
            .and_then(|c| c.get("head_commit"))
            .and_then(|h| h.get("id"))
            .and_then(|v| v.as_str())
            .map(String::from);
        Self { action, commit_id }
    }

    pub fn is_qualifying(&self) -> bool {
        self.action.as_deref() == Some(QUALIFYING_ACTION)
    }
}

/// Delivery metadata GitHub sends in headers, used for log context only.
#[derive(Debug, Clone, Default)]
pub struct DeliveryInfo {
    pub event: Option<String>,
    pub delivery_id: Option<String>,
}

impl DeliveryInfo {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        Self {
            event: header("X-GitHub-Event"),
            delivery_id: header("X-GitHub-Delivery"),
        }
    }
}
