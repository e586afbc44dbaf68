pub mod booking;
pub mod catalog;
pub mod clients;
pub mod config;
pub mod dedup;
pub mod errors;
pub mod handlers;
pub mod notifications;
pub mod openapi;
pub mod phone;
pub mod webhooks;

use crate::clients::stripe::PaymentGateway;
use crate::clients::twilio::SmsSender;
use crate::config::AppConfig;
use crate::dedup::ProcessedEvents;
use crate::notifications::Notifier;
use crate::webhooks::EventRouter;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state. Every external client is constructed once at
/// startup and injected here; handlers only see the trait objects.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<Notifier>,
    pub stripe_events: Arc<EventRouter>,
    pub processed_events: Arc<ProcessedEvents>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        gateway: Arc<dyn PaymentGateway>,
        sms: Arc<dyn SmsSender>,
    ) -> Self {
        let processed_events = Arc::new(ProcessedEvents::new(Duration::from_secs(
            config.webhook_event_ttl_secs,
        )));
        Self {
            config,
            gateway,
            notifier: Arc::new(Notifier::new(sms)),
            stripe_events: Arc::new(EventRouter::with_default_handlers()),
            processed_events,
        }
    }

    pub fn with_event_router(mut self, router: EventRouter) -> Self {
        self.stripe_events = Arc::new(router);
        self
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn status(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
    }))
}

/// All application routes, without middleware layers.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/checkout",
            post(handlers::checkout::create_checkout_session)
                .get(handlers::checkout::get_checkout_session),
        )
        .route(
            "/api/create-bnpl-session",
            post(handlers::bnpl::create_bnpl_session),
        )
        .route(
            "/api/create-payment-intent",
            post(handlers::payment_intents::create_payment_intent),
        )
        .route("/api/webhooks/stripe", post(handlers::stripe_webhook::receive))
        .route("/api/webhooks/cal", post(handlers::cal_webhook::receive))
        .route("/api/webhooks/twilio", post(handlers::twilio_webhook::receive))
        .route("/api/sms/send", post(handlers::sms::send))
        .route("/health", get(health))
        .route("/status", get(status))
}

/// Routes bound to state. Middleware is layered on in `main`.
pub fn app(state: AppState) -> Router {
    api_routes().with_state(state)
}
