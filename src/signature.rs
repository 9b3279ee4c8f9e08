//! HMAC-SHA256 verification of GitHub webhook deliveries

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header GitHub uses to carry the body digest.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Why a delivery was not accepted as authentic.
///
/// These reasons are meant for server-side logs only; the HTTP layer answers
/// every rejection with the same fixed text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("missing signature")]
    MissingSignature,

    #[error("empty body")]
    EmptyBody,

    #[error("digest did not match the signature header")]
    Mismatch,
}

/// Result of checking a body against its signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Authentic,
    Rejected(Rejection),
}

impl Verification {
    pub fn into_result(self) -> Result<(), Rejection> {
        match self {
            Verification::Authentic => Ok(()),
            Verification::Rejected(reason) => Err(reason),
        }
    }
}

fn keyed(secret: &[u8], body: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(body);
    mac
}

/// Computes `sha256=<hex>` for `body` keyed with `secret`.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    let digest = keyed(secret, body).finalize().into_bytes();
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(digest))
}

/// Checks the raw request body against the value of the signature header.
///
/// The header is checked first so a missing signature is reported no matter
/// what the body holds. The digest itself is compared by
/// [`Mac::verify_slice`], which takes the same time wherever the bytes
/// differ.
pub fn verify(raw_body: &[u8], header_value: Option<&str>, secret: &[u8]) -> Verification {
    let supplied = match header_value {
        Some(value) if !value.is_empty() => value,
        _ => return Verification::Rejected(Rejection::MissingSignature),
    };

    if raw_body.is_empty() {
        return Verification::Rejected(Rejection::EmptyBody);
    }

    // GitHub always sends lowercase hex; anything else is not its digest.
    let signature = match supplied.strip_prefix(SIGNATURE_PREFIX) {
        Some(hex_sig) if !hex_sig.bytes().any(|b| b.is_ascii_uppercase()) => hex_sig,
        _ => return Verification::Rejected(Rejection::Mismatch),
    };
    let Ok(signature) = hex::decode(signature) else {
        return Verification::Rejected(Rejection::Mismatch);
    };

    match keyed(secret, raw_body).verify_slice(&signature) {
        Ok(()) => Verification::Authentic,
        Err(_) => Verification::Rejected(Rejection::Mismatch),
    }
}
