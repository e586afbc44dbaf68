//! Scheduling-provider webhook receiver.
//!
//! Verifies the `x-cal-signature-256` HMAC when a secret is configured, then
//! turns booking lifecycle events into SMS notifications. A payload without a
//! phone number is a no-op, not an error.

use crate::errors::ServiceError;
use crate::webhooks::cal::{self, CalTrigger, CalWebhookEvent};
use crate::webhooks::constant_time_eq;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use chrono_tz::Tz;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{info, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-cal-signature-256";

/// Hex HMAC-SHA256 of the raw body, as the scheduler computes it.
pub fn expected_signature(secret: &str, body: &[u8]) -> Result<String, ServiceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ServiceError::Unauthorized("Invalid webhook signature".to_string()))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn verify(config_secret: Option<&str>, headers: &HeaderMap, body: &[u8]) -> Result<(), ServiceError> {
    let Some(secret) = config_secret.filter(|s| !s.is_empty()) else {
        // Development fallback: accepted unsigned, but never silently.
        warn!("cal webhook secret not configured; accepting unsigned webhook");
        return Ok(());
    };

    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized("Missing webhook signature".to_string()))?;

    if constant_time_eq(provided, &expected_signature(secret, body)?) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(
            "Invalid webhook signature".to_string(),
        ))
    }
}

#[utoipa::path(
    post,
    path = "/api/webhooks/cal",
    request_body = String,
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 401, description = "Invalid signature"),
        (status = 500, description = "Malformed payload or processing failure")
    ),
    tag = "webhooks"
)]
#[instrument(skip_all)]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ServiceError> {
    // The whole body is already in memory before any failure path runs; the
    // request stream is single-read.
    verify(state.config.cal_webhook_secret.as_deref(), &headers, &body)?;

    // Malformed JSON maps to a generic 500 body.
    let event: CalWebhookEvent = serde_json::from_slice(&body)?;
    let trigger = event.trigger_event;
    info!(event = trigger.as_str(), uid = ?event.payload.uid, "scheduling webhook received");

    // Scheduler retries on non-2xx; a repeated uid+trigger pair must not
    // re-send a text.
    if let Some(uid) = &event.payload.uid {
        let dedup_key = format!("{uid}:{}", trigger.as_str());
        if !state.processed_events.first_delivery(&dedup_key) {
            info!(dedup_key, "duplicate scheduling webhook ignored");
            return Ok(Json(ack(trigger)));
        }
    }

    let default_tz: Tz = state
        .config
        .default_timezone
        .parse()
        .unwrap_or(chrono_tz::UTC);

    match trigger {
        CalTrigger::BookingCreated | CalTrigger::BookingRequested => {
            match cal::build_booking_details(&event.payload, default_tz) {
                Some(details) => {
                    state.notifier.send_confirmation(&details).await;
                }
                None => info!("booking has no phone number; skipping confirmation"),
            }
        }
        CalTrigger::BookingRescheduled => {
            let details = cal::build_booking_details(&event.payload, default_tz);
            let previous = cal::format_previous_time(&event.payload, default_tz);
            match (details, previous) {
                (Some(details), Some(previous)) => {
                    state.notifier.send_rescheduled(&details, &previous).await;
                }
                (Some(_), None) => {
                    info!("reschedule event without previous start time; no notice sent")
                }
                (None, _) => info!("booking has no phone number; skipping reschedule notice"),
            }
        }
        CalTrigger::BookingCancelled | CalTrigger::BookingRejected => {
            match cal::build_booking_details(&event.payload, default_tz) {
                Some(details) => {
                    state.notifier.send_cancellation(&details).await;
                }
                None => info!("booking has no phone number; skipping cancellation notice"),
            }
        }
        CalTrigger::BookingPaymentInitiated
        | CalTrigger::MeetingEnded
        | CalTrigger::MeetingStarted
        | CalTrigger::RecordingReady => {
            info!(event = trigger.as_str(), "acknowledged without notification");
        }
    }

    Ok(Json(ack(trigger)))
}

fn ack(trigger: CalTrigger) -> Value {
    json!({
        "received": true,
        "event": trigger.as_str(),
        "timestamp": Utc::now().to_rfc3339(),
    })
}
