#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use lumiere_api::clients::stripe::{
    CheckoutSession, CheckoutSessionRequest, PaymentGateway, PaymentIntent, PaymentIntentRequest,
};
use lumiere_api::clients::twilio::{SendOutcome, SmsSender};
use lumiere_api::config::AppConfig;
use lumiere_api::errors::ServiceError;
use lumiere_api::webhooks::EventRouter;
use lumiere_api::{app, AppState};
use serde_json::Value;
use sha1::Sha1;
use sha2::Sha256;
use tower::ServiceExt;

/// Recording payment gateway fake. Responses are canned; requests are kept
/// for assertions.
#[derive(Default)]
pub struct MockGateway {
    pub checkout_requests: Mutex<Vec<CheckoutSessionRequest>>,
    pub retrieved_ids: Mutex<Vec<String>>,
    pub intent_requests: Mutex<Vec<PaymentIntentRequest>>,
    pub fail_with: Mutex<Option<String>>,
}

impl MockGateway {
    pub fn fail_next(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    fn failure(&self) -> Option<ServiceError> {
        self.fail_with
            .lock()
            .unwrap()
            .take()
            .map(ServiceError::Provider)
    }

    pub fn checkout_call_count(&self) -> usize {
        self.checkout_requests.lock().unwrap().len()
    }

    pub fn intent_call_count(&self) -> usize {
        self.intent_requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ServiceError> {
        if let Some(err) = self.failure() {
            return Err(err);
        }
        let amount_total = request
            .line_items
            .iter()
            .map(|item| item.amount_cents * i64::from(item.quantity))
            .sum();
        let session = CheckoutSession {
            id: "cs_test_1".to_string(),
            url: Some("https://checkout.example.com/pay/cs_test_1".to_string()),
            status: Some("open".to_string()),
            payment_status: Some("unpaid".to_string()),
            customer_email: request.customer_email.clone(),
            customer_details: None,
            amount_total: Some(amount_total),
            metadata: request.metadata.clone(),
        };
        self.checkout_requests.lock().unwrap().push(request);
        Ok(session)
    }

    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, ServiceError> {
        if let Some(err) = self.failure() {
            return Err(err);
        }
        self.retrieved_ids.lock().unwrap().push(id.to_string());
        let mut metadata = BTreeMap::new();
        metadata.insert("packageId".to_string(), "brazilian-9".to_string());
        Ok(CheckoutSession {
            id: id.to_string(),
            url: None,
            status: Some("complete".to_string()),
            payment_status: Some("paid".to_string()),
            customer_email: Some("guest@example.com".to_string()),
            customer_details: None,
            amount_total: Some(54_900),
            metadata,
        })
    }

    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, ServiceError> {
        if let Some(err) = self.failure() {
            return Err(err);
        }
        let intent = PaymentIntent {
            id: "pi_test_1".to_string(),
            client_secret: "pi_test_1_secret_abc".to_string(),
            amount: request.amount_cents,
            status: "requires_payment_method".to_string(),
        };
        self.intent_requests.lock().unwrap().push(request);
        Ok(intent)
    }
}

/// Recording SMS fake; every send succeeds.
#[derive(Default)]
pub struct MockSms {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl MockSms {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl SmsSender for MockSms {
    async fn send(&self, to: &str, body: &str) -> SendOutcome {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        SendOutcome::sent("SM_test_1".to_string())
    }
}

pub fn test_config() -> AppConfig {
    AppConfig::new(
        "127.0.0.1".to_string(),
        0,
        "test".to_string(),
        "https://book.example.com".to_string(),
        "sk_test_123".to_string(),
        "whsec_test".to_string(),
        "test-admin-key".to_string(),
    )
}

pub struct TestApp {
    pub router: Router,
    pub gateway: Arc<MockGateway>,
    pub sms: Arc<MockSms>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::build(config, None)
    }

    pub fn with_event_router(config: AppConfig, router: EventRouter) -> Self {
        Self::build(config, Some(router))
    }

    fn build(config: AppConfig, events: Option<EventRouter>) -> Self {
        let gateway = Arc::new(MockGateway::default());
        let sms = Arc::new(MockSms::default());
        let mut state = AppState::new(Arc::new(config), gateway.clone(), sms.clone());
        if let Some(events) = events {
            state = state.with_event_router(events);
        }
        Self {
            router: app(state),
            gateway,
            sms,
        }
    }

    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible router")
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Response<Body> {
        self.request(
            Request::post(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get(&self, path: &str) -> Response<Body> {
        self.request(Request::get(path).body(Body::empty()).unwrap())
            .await
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).expect("JSON response body")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).expect("UTF-8 response body")
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}

/// Builds a `t=...,v1=...` header the way the payment processor signs.
pub fn stripe_signature(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(body);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Hex HMAC-SHA256 of the body, the scheduler's signature scheme.
pub fn cal_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Base64 HMAC-SHA1 over URL + sorted params, the messaging provider's scheme.
pub fn twilio_signature(auth_token: &str, url: &str, params: &BTreeMap<String, String>) -> String {
    let mut mac = Hmac::<Sha1>::new_from_slice(auth_token.as_bytes()).unwrap();
    mac.update(url.as_bytes());
    for (key, value) in params {
        mac.update(key.as_bytes());
        mac.update(value.as_bytes());
    }
    BASE64.encode(mac.finalize().into_bytes())
}
