//! Stripe REST client behind the `PaymentGateway` seam.
//!
//! The client is constructed once at startup and injected through `AppState`;
//! handlers only ever see the trait, which keeps tests on a recording fake.

use crate::errors::ServiceError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, instrument};

const DEFAULT_BASE_URL: &str = "https://api.stripe.com";

/// One hosted-checkout line item, already priced in minor units.
#[derive(Debug, Clone)]
pub struct LineItem {
    pub name: String,
    pub amount_cents: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutSessionRequest {
    pub line_items: Vec<LineItem>,
    pub payment_method_types: Vec<String>,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
    /// Copied onto the payment intent Stripe creates for the session, so the
    /// webhook sees the same keys on `payment_intent.*` events.
    pub payment_intent_metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
    pub amount_cents: i64,
    pub currency: String,
    pub receipt_email: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl CheckoutSession {
    /// Email supplied at creation, falling back to what Stripe collected.
    pub fn effective_email(&self) -> Option<&str> {
        self.customer_email
            .as_deref()
            .or_else(|| self.customer_details.as_ref()?.email.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: i64,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(default)]
    message: Option<String>,
}

/// Payment processor operations the endpoints need. The processor is the
/// source of truth; nothing is persisted locally.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ServiceError>;

    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, ServiceError>;

    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, ServiceError>;
}

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self::with_base_url(secret_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(secret_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            secret_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<T, ServiceError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, path, "stripe request failed");
                ServiceError::Provider("payment processor unreachable".to_string())
            })?;

        Self::decode(response).await
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ServiceError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.secret_key)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, path, "stripe request failed");
                ServiceError::Provider("payment processor unreachable".to_string())
            })?;

        Self::decode(response).await
    }

    async fn decode<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            error!(error = %e, "failed reading stripe response body");
            ServiceError::Provider("payment processor returned an unreadable response".to_string())
        })?;

        if !status.is_success() {
            // Surface only Stripe's human-readable message, never the raw body.
            let message = serde_json::from_slice::<StripeErrorBody>(&bytes)
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| "payment processor rejected the request".to_string());
            error!(status = %status, message, "stripe API error");
            return Err(ServiceError::Provider(message));
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            error!(error = %e, "failed decoding stripe response");
            ServiceError::Provider("payment processor returned an unexpected response".to_string())
        })
    }
}

/// Flattens a checkout session request into Stripe's bracketed form encoding.
fn checkout_session_params(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    if let Some(email) = &request.customer_email {
        params.push(("customer_email".to_string(), email.clone()));
    }

    for (i, method) in request.payment_method_types.iter().enumerate() {
        params.push((format!("payment_method_types[{i}]"), method.clone()));
    }

    for (i, item) in request.line_items.iter().enumerate() {
        params.push((
            format!("line_items[{i}][price_data][currency]"),
            "usd".to_string(),
        ));
        params.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            item.name.clone(),
        ));
        params.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            item.amount_cents.to_string(),
        ));
        params.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
    }

    for (key, value) in &request.metadata {
        params.push((format!("metadata[{key}]"), value.clone()));
    }
    for (key, value) in &request.payment_intent_metadata {
        params.push((format!("payment_intent_data[metadata][{key}]"), value.clone()));
    }

    params
}

fn payment_intent_params(request: &PaymentIntentRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("amount".to_string(), request.amount_cents.to_string()),
        ("currency".to_string(), request.currency.clone()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
    ];

    if let Some(email) = &request.receipt_email {
        params.push(("receipt_email".to_string(), email.clone()));
    }
    for (key, value) in &request.metadata {
        params.push((format!("metadata[{key}]"), value.clone()));
    }

    params
}

#[async_trait]
impl PaymentGateway for StripeClient {
    #[instrument(skip(self, request), fields(line_items = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ServiceError> {
        self.post_form("/v1/checkout/sessions", checkout_session_params(&request))
            .await
    }

    #[instrument(skip(self))]
    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, ServiceError> {
        self.get(
            &format!("/v1/checkout/sessions/{id}"),
            &[("expand[]", "payment_intent"), ("expand[]", "customer")],
        )
        .await
    }

    // The client secret in the response must never be logged; skip_all keeps
    // it out of the span.
    #[instrument(skip_all, fields(amount_cents = request.amount_cents))]
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, ServiceError> {
        self.post_form("/v1/payment_intents", payment_intent_params(&request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_session_params_encode_line_items_and_metadata() {
        let mut metadata = BTreeMap::new();
        metadata.insert("packageId".to_string(), "brazilian-9".to_string());
        let mut pi_metadata = BTreeMap::new();
        pi_metadata.insert("packageId".to_string(), "brazilian-9".to_string());

        let request = CheckoutSessionRequest {
            line_items: vec![LineItem {
                name: "Brazilian Wax Package (9 + 3 Free)".to_string(),
                amount_cents: 54_900,
                quantity: 1,
            }],
            payment_method_types: vec!["card".into(), "klarna".into()],
            customer_email: Some("guest@example.com".into()),
            success_url: "https://book.example.com/success".into(),
            cancel_url: "https://book.example.com/packages".into(),
            metadata,
            payment_intent_metadata: pi_metadata,
        };

        let params = checkout_session_params(&request);
        let find = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(find("mode"), Some("payment"));
        assert_eq!(find("payment_method_types[0]"), Some("card"));
        assert_eq!(find("payment_method_types[1]"), Some("klarna"));
        assert_eq!(
            find("line_items[0][price_data][unit_amount]"),
            Some("54900")
        );
        assert_eq!(find("line_items[0][quantity]"), Some("1"));
        assert_eq!(find("metadata[packageId]"), Some("brazilian-9"));
        assert_eq!(
            find("payment_intent_data[metadata][packageId]"),
            Some("brazilian-9")
        );
    }

    #[test]
    fn payment_intent_params_enable_automatic_methods() {
        let request = PaymentIntentRequest {
            amount_cents: 54_900,
            currency: "usd".into(),
            receipt_email: None,
            metadata: BTreeMap::new(),
        };

        let params = payment_intent_params(&request);
        assert!(params.contains(&("amount".to_string(), "54900".to_string())));
        assert!(params.contains(&(
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string()
        )));
        assert!(!params.iter().any(|(k, _)| k == "receipt_email"));
    }

    #[test]
    fn effective_email_falls_back_to_customer_details() {
        let session = CheckoutSession {
            id: "cs_test".into(),
            url: None,
            status: Some("complete".into()),
            payment_status: Some("paid".into()),
            customer_email: None,
            customer_details: Some(CustomerDetails {
                email: Some("collected@example.com".into()),
            }),
            amount_total: Some(54_900),
            metadata: BTreeMap::new(),
        };
        assert_eq!(session.effective_email(), Some("collected@example.com"));
    }

    #[test]
    fn stripe_error_body_parses_message() {
        let body = r#"{"error":{"message":"No such package price","type":"invalid_request_error"}}"#;
        let parsed: StripeErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message.as_deref(), Some("No such package price"));
    }
}
