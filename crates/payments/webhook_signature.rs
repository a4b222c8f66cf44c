//! Stripe webhook signature verification.
//!
//! The `stripe-signature` header looks like `t=1614556800,v1=abcdef...`, possibly
//! with several `v1` entries during secret rotation. The signed payload is
//! `{t}.{raw body}`, signed with HMAC-SHA256 under the endpoint secret.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::payments::stripe_types::StripeEvent;

type HmacSha256 = Hmac<Sha256>;

/// Stripe's default tolerance for signed timestamps.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("missing timestamp in stripe-signature")]
    MissingTimestamp,
    #[error("missing v1 signature in stripe-signature")]
    MissingSignature,
    #[error("timestamp outside the tolerance zone")]
    TimestampOutsideTolerance,
    #[error("no signatures found matching the expected signature for payload")]
    Mismatch,
    #[error("invalid webhook secret")]
    InvalidSecret,
    #[error("invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Verifies `payload` against `signature_header` and parses the event.
///
/// `payload` must be the exact bytes received; re-serialized JSON will not match.
pub fn construct_event(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<StripeEvent, SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in signature_header.split(',') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = rest.parse().ok();
        } else if let Some(rest) = part.strip_prefix("v1=") {
            // Undecodable entries cannot match; skip them rather than failing the whole header.
            if let Ok(bytes) = hex::decode(rest) {
                signatures.push(bytes);
            }
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }

    let mac = signed_payload_mac(payload, timestamp, secret)?;
    let matched = signatures
        .iter()
        .any(|candidate| mac.clone().verify_slice(candidate).is_ok());
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    if now.timestamp() - timestamp > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::TimestampOutsideTolerance);
    }

    Ok(serde_json::from_slice(payload)?)
}

/// Builds a `stripe-signature` header value for `payload`, as Stripe would send it.
#[cfg(any(test, feature = "test-util"))]
pub fn signature_header(
    payload: &[u8],
    secret: &str,
    timestamp: i64,
) -> Result<String, SignatureError> {
    let mac = signed_payload_mac(payload, timestamp, secret)?;
    Ok(format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    ))
}

fn signed_payload_mac(
    payload: &[u8],
    timestamp: i64,
    secret: &str,
) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}
