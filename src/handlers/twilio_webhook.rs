//! Inbound SMS webhook receiver.
//!
//! Replies are synchronous TwiML; the provider does not retry on non-200, so
//! every processing path answers 200 with a reply document. The only non-200
//! is a failed signature check in production.

use crate::errors::ServiceError;
use crate::webhooks::constant_time_eq;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

type HmacSha1 = Hmac<Sha1>;

pub const SIGNATURE_HEADER: &str = "x-twilio-signature";

const OPT_OUT_KEYWORDS: &[&str] = &["STOP", "UNSUBSCRIBE", "CANCEL", "END", "QUIT"];
const OPT_IN_KEYWORDS: &[&str] = &["START", "SUBSCRIBE", "YES"];

const REPLY_OPT_OUT: &str = "You have been unsubscribed from Lumière Wax Studio messages. \
     Reply START to resubscribe.";
const REPLY_OPT_IN: &str = "You're resubscribed to Lumière Wax Studio messages. \
     Reply STOP to opt out at any time.";
const REPLY_HELP: &str = "Lumière Wax Studio: book online at lumierewax.studio or call \
     (310) 555-0199. Reply STOP to opt out.";
const REPLY_GENERIC: &str = "Thanks for reaching out to Lumière Wax Studio! Book online at \
     lumierewax.studio or call (310) 555-0199. Reply STOP to opt out.";
const REPLY_FALLBACK: &str = "Sorry, something went wrong on our end. Please call \
     (310) 555-0199 and we'll take care of you.";

/// Provider signature scheme: base64 HMAC-SHA1 over the public webhook URL
/// followed by every form parameter's name and value in lexicographic order.
pub fn expected_signature(
    auth_token: &str,
    url: &str,
    params: &BTreeMap<String, String>,
) -> Option<String> {
    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes()).ok()?;
    mac.update(url.as_bytes());
    for (key, value) in params {
        mac.update(key.as_bytes());
        mac.update(value.as_bytes());
    }
    Some(BASE64.encode(mac.finalize().into_bytes()))
}

/// Picks the reply for an inbound message body. Keyword matching is
/// case-insensitive on the trimmed body. The opt-out reply is advisory:
/// actual suppression is enforced by the provider.
pub fn reply_for(body: &str) -> &'static str {
    let normalized = body.trim().to_ascii_uppercase();
    if OPT_OUT_KEYWORDS.contains(&normalized.as_str()) {
        REPLY_OPT_OUT
    } else if OPT_IN_KEYWORDS.contains(&normalized.as_str()) {
        REPLY_OPT_IN
    } else if normalized == "HELP" {
        REPLY_HELP
    } else {
        REPLY_GENERIC
    }
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn twiml_reply(message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        xml_escape(message)
    )
}

fn twiml_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/xml")],
        twiml_reply(message),
    )
        .into_response()
}

fn parse_form(body: &[u8]) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(body)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[utoipa::path(
    post,
    path = "/api/webhooks/twilio",
    request_body = String,
    responses(
        (status = 200, description = "TwiML reply", content_type = "text/xml"),
        (status = 403, description = "Signature check failed (production only)")
    ),
    tag = "webhooks"
)]
#[instrument(skip_all)]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let params = parse_form(&body);

    // Signature enforcement is production-only; locally the tunnel URL never
    // matches the configured public base.
    if state.config.is_production() {
        if let Err(err) = check_signature(&state, &headers, &params) {
            warn!(error = %err, "inbound SMS signature check failed");
            return err.into_response();
        }
    }

    let from = params.get("From").map(String::as_str).unwrap_or_default();
    let message_body = params.get("Body").map(String::as_str).unwrap_or_default();
    let message_sid = params.get("MessageSid").map(String::as_str).unwrap_or_default();

    info!(from, message_sid, "inbound SMS received");

    if from.is_empty() && message_body.is_empty() {
        // Unparseable delivery: still 200, degraded reply, no retry storm.
        return twiml_response(StatusCode::OK, REPLY_FALLBACK);
    }

    twiml_response(StatusCode::OK, reply_for(message_body))
}

fn check_signature(
    state: &AppState,
    headers: &HeaderMap,
    params: &BTreeMap<String, String>,
) -> Result<(), ServiceError> {
    let auth_token = state
        .config
        .twilio_auth_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ServiceError::Forbidden("Inbound SMS signature cannot be verified".to_string())
        })?;

    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::Forbidden("Missing request signature".to_string()))?;

    let expected = expected_signature(auth_token, &state.config.twilio_webhook_url(), params)
        .ok_or_else(|| ServiceError::Forbidden("Invalid request signature".to_string()))?;

    if constant_time_eq(provided, &expected) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "Invalid request signature".to_string(),
        ))
    }
}
