//! HTTP handlers: the signed webhook endpoint plus read-only status routes

pub mod status;
pub mod webhook;

pub use status::{get_job, root, status};
pub use webhook::handle_payload;
