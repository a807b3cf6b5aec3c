//! Gateway webhook handling: signature verification and event parsing
//!
//! Delivery is at-least-once and possibly out of order; nothing here trusts
//! an event to arrive exactly once. An unauthenticated or malformed payload
//! is rejected before any state change.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::utils::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Signature header carried on every webhook request:
/// `X-Gateway-Signature: t=<unix seconds>,v1=<hex hmac-sha256>`
pub const SIGNATURE_HEADER: &str = "x-gateway-signature";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingSignature,

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Timestamp outside tolerance: {0}")]
    TimestampTolerance(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::MalformedPayload(msg) => AppError::Validation(msg),
            // Authentication failures: reject outright, no retry encouragement
            other => AppError::invalid_token(other.to_string()),
        }
    }
}

/// Inbound payment events, a closed set.
///
/// Anything that does not parse into one of these variants is rejected as a
/// validation error rather than pattern-matched loosely.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// Payment collected; the booking can be confirmed
    PaymentCompleted {
        booking_id: String,
        payment_ref: String,
    },
    /// Checkout session expired without payment
    PaymentExpired { booking_id: String },
}

impl GatewayEvent {
    pub fn booking_id(&self) -> &str {
        match self {
            GatewayEvent::PaymentCompleted { booking_id, .. } => booking_id,
            GatewayEvent::PaymentExpired { booking_id } => booking_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GatewayEvent::PaymentCompleted { .. } => "payment_completed",
            GatewayEvent::PaymentExpired { .. } => "payment_expired",
        }
    }
}

/// Verify the gateway signature over the raw body.
///
/// The signed payload is `"{t}.{body}"`, HMAC-SHA256 with the shared
/// webhook secret, hex encoded, compared in constant time. The timestamp
/// must be within `tolerance_seconds` of now to limit replays.
pub fn verify_signature(
    payload: &[u8],
    signature_header: Option<&str>,
    webhook_secret: &str,
    tolerance_seconds: i64,
) -> Result<(), WebhookError> {
    let header = signature_header.ok_or(WebhookError::MissingSignature)?;

    // Parse "t=timestamp,v1=signature[,v1=...]"
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.split_once('=') {
            Some(("t", v)) => timestamp = v.trim().parse().ok(),
            Some(("v1", v)) => signatures.push(v.trim()),
            _ => {} // Ignore unknown fields
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        WebhookError::InvalidSignature("Missing timestamp in signature header".to_string())
    })?;
    if signatures.is_empty() {
        return Err(WebhookError::InvalidSignature(
            "No v1 signature found".to_string(),
        ));
    }

    let now = chrono::Utc::now().timestamp();
    let drift = (now - timestamp).abs();
    if drift > tolerance_seconds {
        return Err(WebhookError::TimestampTolerance(format!(
            "timestamp {} differs from now {} by {}s (tolerance {}s)",
            timestamp, now, drift, tolerance_seconds
        )));
    }

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|e| WebhookError::InvalidSignature(format!("HMAC init error: {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    // Constant-time comparison to prevent timing attacks
    let valid = signatures.iter().any(|sig| {
        sig.len() == expected.len()
            && sig
                .bytes()
                .zip(expected.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    });

    if valid {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature(
            "Signature mismatch".to_string(),
        ))
    }
}

/// Parse the raw body into a [`GatewayEvent`]
pub fn parse_event(payload: &[u8]) -> Result<GatewayEvent, WebhookError> {
    serde_json::from_slice(payload)
        .map_err(|e| WebhookError::MalformedPayload(format!("JSON parse error: {e}")))
}

#[cfg(test)]
pub(crate) fn sign_for_tests(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-webhook-secret";

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"type":"payment_expired","booking_id":"b1"}"#;
        let header = sign_for_tests(body, SECRET, chrono::Utc::now().timestamp());
        assert!(verify_signature(body, Some(&header), SECRET, 300).is_ok());
    }

    #[test]
    fn rejects_wrong_secret() {
        let body = b"{}";
        let header = sign_for_tests(body, "other-secret", chrono::Utc::now().timestamp());
        assert!(matches!(
            verify_signature(body, Some(&header), SECRET, 300),
            Err(WebhookError::InvalidSignature(_))
        ));
    }

    #[test]
    fn rejects_tampered_body() {
        let header = sign_for_tests(b"original", SECRET, chrono::Utc::now().timestamp());
        assert!(verify_signature(b"tampered", Some(&header), SECRET, 300).is_err());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let body = b"{}";
        let header = sign_for_tests(body, SECRET, chrono::Utc::now().timestamp() - 3600);
        assert!(matches!(
            verify_signature(body, Some(&header), SECRET, 300),
            Err(WebhookError::TimestampTolerance(_))
        ));
    }

    #[test]
    fn rejects_missing_header() {
        assert!(matches!(
            verify_signature(b"{}", None, SECRET, 300),
            Err(WebhookError::MissingSignature)
        ));
    }

    #[test]
    fn parses_completed_event() {
        let event = parse_event(
            br#"{"type":"payment_completed","booking_id":"b1","payment_ref":"pi_42"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            GatewayEvent::PaymentCompleted {
                booking_id: "b1".into(),
                payment_ref: "pi_42".into()
            }
        );
    }

    #[test]
    fn rejects_unknown_event_kind() {
        let err = parse_event(br#"{"type":"payout_paid","booking_id":"b1"}"#).unwrap_err();
        assert!(matches!(err, WebhookError::MalformedPayload(_)));
    }
}
