//! Outbound SMS notifications for booking lifecycle events.
//!
//! Every template funnels through the single `SmsSender::send` primitive, so
//! destination canonicalization and provider failure handling live in one
//! place.

use crate::clients::twilio::{SendOutcome, SmsSender};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

const STUDIO_NAME: &str = "Lumière Wax Studio";
const STUDIO_PHONE: &str = "(310) 555-0199";

/// Ephemeral booking summary built from a scheduling webhook payload and
/// consumed immediately by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDetails {
    pub customer_name: String,
    pub customer_phone: String,
    pub service_name: String,
    /// Human-formatted, timezone-aware (e.g. "Friday, March 6 at 2:30 PM PST")
    pub date_time: String,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    DayBefore,
    TwoHours,
}

#[derive(Clone)]
pub struct Notifier {
    sms: Arc<dyn SmsSender>,
}

impl Notifier {
    pub fn new(sms: Arc<dyn SmsSender>) -> Self {
        Self { sms }
    }

    #[instrument(skip_all, fields(service = %details.service_name))]
    pub async fn send_confirmation(&self, details: &BookingDetails) -> SendOutcome {
        let body = format!(
            "Hi {}! Your {} appointment at {} is confirmed for {} ({} min). \
             Reply HELP for assistance or STOP to opt out.",
            details.customer_name,
            details.service_name,
            STUDIO_NAME,
            details.date_time,
            details.duration_minutes,
        );
        self.deliver(&details.customer_phone, &body).await
    }

    #[instrument(skip_all, fields(service = %details.service_name))]
    pub async fn send_reminder(&self, details: &BookingDetails, kind: ReminderKind) -> SendOutcome {
        let lead = match kind {
            ReminderKind::DayBefore => "tomorrow",
            ReminderKind::TwoHours => "in 2 hours",
        };
        let body = format!(
            "Reminder from {}: your {} appointment is {} — {}. \
             Please arrive 10 minutes early. Questions? Call {}.",
            STUDIO_NAME, details.service_name, lead, details.date_time, STUDIO_PHONE,
        );
        self.deliver(&details.customer_phone, &body).await
    }

    #[instrument(skip_all, fields(service = %details.service_name))]
    pub async fn send_cancellation(&self, details: &BookingDetails) -> SendOutcome {
        let body = format!(
            "Hi {}, your {} appointment on {} at {} has been cancelled. \
             Rebook any time at lumierewax.studio or call {}.",
            details.customer_name,
            details.service_name,
            details.date_time,
            STUDIO_NAME,
            STUDIO_PHONE,
        );
        self.deliver(&details.customer_phone, &body).await
    }

    #[instrument(skip_all, fields(service = %details.service_name))]
    pub async fn send_rescheduled(
        &self,
        details: &BookingDetails,
        old_date_time: &str,
    ) -> SendOutcome {
        let body = format!(
            "Hi {}, your {} appointment at {} has been moved from {} to {}. \
             See you then!",
            details.customer_name,
            details.service_name,
            STUDIO_NAME,
            old_date_time,
            details.date_time,
        );
        self.deliver(&details.customer_phone, &body).await
    }

    #[instrument(skip_all)]
    pub async fn send_custom(&self, destination: &str, message: &str) -> SendOutcome {
        self.deliver(destination, message).await
    }

    async fn deliver(&self, destination: &str, body: &str) -> SendOutcome {
        let outcome = self.sms.send(destination, body).await;
        if outcome.success {
            info!(message_id = ?outcome.message_id, "notification sent");
        } else {
            warn!(error = ?outcome.error, "notification send failed");
        }
        outcome
    }
}
