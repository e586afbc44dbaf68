//! Payment-processor webhook receiver.
//!
//! Signature verification is mandatory here; there is no development bypass.
//! Verification runs over the exact request bytes, so the handler takes the
//! raw body rather than a JSON extractor.

use crate::errors::ServiceError;
use crate::webhooks::constant_time_eq;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{info, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Verifies a `t=<ts>,v1=<sig>` signature header against the raw body.
/// The signed payload is `"{t}.{body}"`; any matching `v1` entry passes.
/// When `tolerance_secs` is set, the embedded timestamp must be within that
/// window of `now` in either direction.
pub fn verify_signature(
    secret: &str,
    header: &str,
    body: &[u8],
    tolerance_secs: Option<u64>,
    now: i64,
) -> Result<(), ServiceError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(ServiceError::InvalidSignature)?;
    if candidates.is_empty() {
        return Err(ServiceError::InvalidSignature);
    }

    if let Some(tolerance) = tolerance_secs {
        if (now - timestamp).unsigned_abs() > tolerance {
            warn!(timestamp, "webhook signature timestamp outside tolerance");
            return Err(ServiceError::InvalidSignature);
        }
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ServiceError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    if candidates.iter().any(|sig| constant_time_eq(sig, &expected)) {
        Ok(())
    } else {
        Err(ServiceError::InvalidSignature)
    }
}

#[utoipa::path(
    post,
    path = "/api/webhooks/stripe",
    request_body = String,
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 400, description = "Missing or invalid signature"),
        (status = 500, description = "Verified event failed processing; provider should retry")
    ),
    tag = "webhooks"
)]
#[instrument(skip_all)]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ServiceError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ServiceError::MissingSignature)?;

    verify_signature(
        &state.config.stripe_webhook_secret,
        signature,
        &body,
        state.config.stripe_webhook_tolerance_secs,
        Utc::now().timestamp(),
    )?;

    let event: Value = serde_json::from_slice(&body)
        .map_err(|_| ServiceError::BadRequest("Malformed event payload".to_string()))?;

    let event_id = event
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let event_type = event
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    // At-least-once delivery: repeats of a verified event are acknowledged
    // without re-running handlers.
    if !event_id.is_empty() && !state.processed_events.first_delivery(&event_id) {
        info!(event_id, event_type, "duplicate webhook delivery ignored");
        return Ok(Json(json!({ "received": true })));
    }

    // A handler failure surfaces as 5xx so the provider retries; signature
    // failures above stay 4xx so it does not. The id is un-recorded on
    // failure so the retry is not absorbed as a duplicate.
    let handled = match state.stripe_events.dispatch(&event_type, event).await {
        Ok(handled) => handled,
        Err(err) => {
            if !event_id.is_empty() {
                state.processed_events.forget(&event_id);
            }
            return Err(err);
        }
    };
    info!(event_id, event_type, handled, "payment webhook processed");

    Ok(Json(json!({ "received": true })))
}
