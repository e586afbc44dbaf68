//! Shared webhook infrastructure: the per-event-type handler registry and
//! constant-time signature comparison.

pub mod cal;

use crate::errors::ServiceError;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub type EventHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<(), ServiceError>> + Send + Sync>;

/// Dispatches verified payment-processor events to handlers registered per
/// event type. Unrecognized types are acknowledged without action; the
/// registry exists so fulfillment or email handlers can be attached later
/// without touching the receiver.
#[derive(Clone, Default)]
pub struct EventRouter {
    handlers: HashMap<String, EventHandler>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `event_type`, replacing any existing one.
    pub fn on<F>(mut self, event_type: &str, handler: F) -> Self
    where
        F: Fn(Value) -> BoxFuture<'static, Result<(), ServiceError>> + Send + Sync + 'static,
    {
        self.handlers.insert(event_type.to_string(), Arc::new(handler));
        self
    }

    /// Log-only defaults for the event types the studio cares about today.
    /// Fulfillment (granting package credits) and receipts hang off these
    /// hooks once built.
    pub fn with_default_handlers() -> Self {
        fn log_only(label: &'static str) -> impl Fn(Value) -> BoxFuture<'static, Result<(), ServiceError>> {
            move |event| {
                Box::pin(async move {
                    let object_id = event
                        .pointer("/data/object/id")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown");
                    info!(event = label, object_id, "payment event received");
                    Ok(())
                })
            }
        }

        Self::new()
            .on("payment_intent.succeeded", log_only("payment_intent.succeeded"))
            .on(
                "payment_intent.payment_failed",
                log_only("payment_intent.payment_failed"),
            )
            .on("charge.refunded", log_only("charge.refunded"))
            .on("customer.created", log_only("customer.created"))
            .on(
                "checkout.session.completed",
                log_only("checkout.session.completed"),
            )
    }

    /// Runs the handler for `event_type` if one is registered. Returns whether
    /// the event was recognized; handler failures propagate so the receiver
    /// can answer 5xx and trigger a provider retry.
    pub async fn dispatch(&self, event_type: &str, event: Value) -> Result<bool, ServiceError> {
        match self.handlers.get(event_type) {
            Some(handler) => {
                handler(event).await?;
                Ok(true)
            }
            None => {
                info!(event_type, "unhandled webhook event type");
                Ok(false)
            }
        }
    }

    pub fn recognizes(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }
}

/// Constant-time string comparison for signature checks.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
