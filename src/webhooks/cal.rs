//! Cal.com webhook payload model and field extraction.
//!
//! Scheduler payloads are loosely shaped: contact details live in a
//! free-form `responses` map whose field names vary by event type
//! configuration. Extraction is an explicit ordered candidate list so the
//! precedence policy is testable in isolation.

use crate::notifications::BookingDetails;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Response-map keys checked, in order, for a contact phone number.
pub const PHONE_FIELD_CANDIDATES: &[&str] = &["phone", "phoneNumber", "phone_number", "mobile"];

const NAME_PLACEHOLDER: &str = "Valued Guest";
const SERVICE_PLACEHOLDER: &str = "your appointment";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalTrigger {
    BookingCreated,
    BookingRescheduled,
    BookingCancelled,
    BookingRejected,
    BookingRequested,
    BookingPaymentInitiated,
    MeetingEnded,
    MeetingStarted,
    RecordingReady,
}

impl CalTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BookingCreated => "BOOKING_CREATED",
            Self::BookingRescheduled => "BOOKING_RESCHEDULED",
            Self::BookingCancelled => "BOOKING_CANCELLED",
            Self::BookingRejected => "BOOKING_REJECTED",
            Self::BookingRequested => "BOOKING_REQUESTED",
            Self::BookingPaymentInitiated => "BOOKING_PAYMENT_INITIATED",
            Self::MeetingEnded => "MEETING_ENDED",
            Self::MeetingStarted => "MEETING_STARTED",
            Self::RecordingReady => "RECORDING_READY",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalWebhookEvent {
    pub trigger_event: CalTrigger,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub payload: CalBookingPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalBookingPayload {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Event-type name as configured in the scheduler (the service name).
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Present only on reschedules: the booking's previous start time.
    #[serde(default)]
    pub reschedule_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub organizer: Option<CalPerson>,
    #[serde(default)]
    pub attendees: Vec<CalPerson>,
    #[serde(default)]
    pub responses: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalPerson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// Reads a response-map field that may be a bare string or a
/// `{"label": …, "value": …}` object.
fn response_value(responses: &Map<String, Value>, key: &str) -> Option<String> {
    let entry = responses.get(key)?;
    let value = match entry {
        Value::String(s) => s.clone(),
        Value::Object(obj) => match obj.get("value") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            _ => return None,
        },
        _ => return None,
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// First non-empty phone number among the known response fields, or `None`
/// when the booking carries no destination at all.
pub fn extract_phone(payload: &CalBookingPayload) -> Option<String> {
    PHONE_FIELD_CANDIDATES
        .iter()
        .find_map(|key| response_value(&payload.responses, key))
}

/// Attendee name, then the named response field, then a placeholder.
pub fn extract_customer_name(payload: &CalBookingPayload) -> String {
    payload
        .attendees
        .first()
        .and_then(|a| a.name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| response_value(&payload.responses, "name"))
        .unwrap_or_else(|| NAME_PLACEHOLDER.to_string())
}

/// Attendee timezone, then organizer timezone, then the configured default.
pub fn extract_timezone(payload: &CalBookingPayload, default_tz: Tz) -> Tz {
    payload
        .attendees
        .first()
        .and_then(|a| a.time_zone.as_deref())
        .or_else(|| payload.organizer.as_ref()?.time_zone.as_deref())
        .and_then(|name| name.parse().ok())
        .unwrap_or(default_tz)
}

pub fn extract_service_name(payload: &CalBookingPayload) -> String {
    payload
        .event_type
        .as_deref()
        .or(payload.title.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| SERVICE_PLACEHOLDER.to_string())
}

/// Whole minutes between start and end: round((end − start) / 60000).
pub fn duration_minutes(payload: &CalBookingPayload) -> i64 {
    match (payload.start_time, payload.end_time) {
        (Some(start), Some(end)) => {
            let millis = (end - start).num_milliseconds();
            (millis as f64 / 60_000.0).round() as i64
        }
        _ => 0,
    }
}

/// "Friday, March 6 at 2:30 PM PST"
pub fn format_in_zone(instant: DateTime<Utc>, tz: Tz) -> String {
    instant
        .with_timezone(&tz)
        .format("%A, %B %-d at %-I:%M %p %Z")
        .to_string()
}

/// Assembles the notification payload. Returns `None` when the booking has no
/// reachable phone number, which is a no-op path, not an error.
pub fn build_booking_details(payload: &CalBookingPayload, default_tz: Tz) -> Option<BookingDetails> {
    let customer_phone = extract_phone(payload)?;
    let tz = extract_timezone(payload, default_tz);
    let date_time = payload
        .start_time
        .map(|start| format_in_zone(start, tz))
        .unwrap_or_else(|| "your scheduled time".to_string());

    Some(BookingDetails {
        customer_name: extract_customer_name(payload),
        customer_phone,
        service_name: extract_service_name(payload),
        date_time,
        duration_minutes: duration_minutes(payload),
    })
}

/// The previous appointment time of a rescheduled booking, formatted in the
/// same zone as the new one. `None` when the payload omits it, in which case
/// no reschedule notice is sent.
pub fn format_previous_time(payload: &CalBookingPayload, default_tz: Tz) -> Option<String> {
    let tz = extract_timezone(payload, default_tz);
    payload
        .reschedule_start_time
        .map(|start| format_in_zone(start, tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload_from(value: Value) -> CalBookingPayload {
        serde_json::from_value(value).unwrap()
    }

    fn la() -> Tz {
        "America/Los_Angeles".parse().unwrap()
    }

    #[test]
    fn trigger_names_round_trip() {
        let event: CalWebhookEvent = serde_json::from_value(json!({
            "triggerEvent": "BOOKING_CREATED",
            "payload": {}
        }))
        .unwrap();
        assert_eq!(event.trigger_event, CalTrigger::BookingCreated);
        assert_eq!(event.trigger_event.as_str(), "BOOKING_CREATED");
    }

    #[test]
    fn phone_extraction_follows_candidate_order() {
        let payload = payload_from(json!({
            "responses": {
                "phoneNumber": {"value": "+13105550101"},
                "phone": {"value": "+13105550100"}
            }
        }));
        // "phone" wins even though "phoneNumber" is also present.
        assert_eq!(extract_phone(&payload).as_deref(), Some("+13105550100"));

        let payload = payload_from(json!({
            "responses": {"mobile": "+13105550102"}
        }));
        assert_eq!(extract_phone(&payload).as_deref(), Some("+13105550102"));
    }

    #[test]
    fn missing_phone_yields_none() {
        let payload = payload_from(json!({
            "responses": {"name": {"value": "Dana"}, "email": {"value": "d@example.com"}}
        }));
        assert_eq!(extract_phone(&payload), None);

        let payload = payload_from(json!({
            "responses": {"phone": {"value": "   "}}
        }));
        assert_eq!(extract_phone(&payload), None);
    }

    #[test]
    fn name_falls_back_attendee_then_response_then_placeholder() {
        let payload = payload_from(json!({
            "attendees": [{"name": "Dana Attendee"}],
            "responses": {"name": {"value": "Dana Response"}}
        }));
        assert_eq!(extract_customer_name(&payload), "Dana Attendee");

        let payload = payload_from(json!({
            "attendees": [{"name": "  "}],
            "responses": {"name": {"value": "Dana Response"}}
        }));
        assert_eq!(extract_customer_name(&payload), "Dana Response");

        let payload = payload_from(json!({}));
        assert_eq!(extract_customer_name(&payload), "Valued Guest");
    }

    #[test]
    fn timezone_falls_back_attendee_then_organizer_then_default() {
        let payload = payload_from(json!({
            "attendees": [{"timeZone": "America/New_York"}],
            "organizer": {"timeZone": "America/Chicago"}
        }));
        assert_eq!(extract_timezone(&payload, la()).name(), "America/New_York");

        let payload = payload_from(json!({
            "organizer": {"timeZone": "America/Chicago"}
        }));
        assert_eq!(extract_timezone(&payload, la()).name(), "America/Chicago");

        let payload = payload_from(json!({
            "attendees": [{"timeZone": "Not/AZone"}]
        }));
        assert_eq!(extract_timezone(&payload, la()).name(), "America/Los_Angeles");
    }

    #[test]
    fn duration_rounds_to_whole_minutes() {
        let payload = payload_from(json!({
            "startTime": "2026-03-06T22:30:00Z",
            "endTime": "2026-03-06T23:00:30Z"
        }));
        // 30.5 minutes rounds to 31.
        assert_eq!(duration_minutes(&payload), 31);

        let payload = payload_from(json!({"startTime": "2026-03-06T22:30:00Z"}));
        assert_eq!(duration_minutes(&payload), 0);
    }

    #[test]
    fn booking_details_formats_in_attendee_zone() {
        let payload = payload_from(json!({
            "type": "Brazilian Wax",
            "startTime": "2026-03-06T22:30:00Z",
            "endTime": "2026-03-06T23:00:00Z",
            "attendees": [{"name": "Dana", "timeZone": "America/Los_Angeles"}],
            "responses": {"phone": {"value": "3103097901"}}
        }));

        let details = build_booking_details(&payload, la()).unwrap();
        assert_eq!(details.customer_name, "Dana");
        assert_eq!(details.customer_phone, "3103097901");
        assert_eq!(details.service_name, "Brazilian Wax");
        assert_eq!(details.duration_minutes, 30);
        // 22:30 UTC is 2:30 PM PST on that date.
        assert_eq!(details.date_time, "Friday, March 6 at 2:30 PM PST");
    }

    #[test]
    fn previous_time_requires_reschedule_start() {
        let payload = payload_from(json!({
            "startTime": "2026-03-06T22:30:00Z"
        }));
        assert_eq!(format_previous_time(&payload, la()), None);

        let payload = payload_from(json!({
            "rescheduleStartTime": "2026-03-05T21:00:00Z",
            "attendees": [{"timeZone": "America/Los_Angeles"}]
        }));
        assert_eq!(
            format_previous_time(&payload, la()).as_deref(),
            Some("Thursday, March 5 at 1:00 PM PST")
        );
    }
}
