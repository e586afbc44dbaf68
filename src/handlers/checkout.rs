//! Hosted-checkout session creation and status reads.

use crate::catalog;
use crate::clients::stripe::{CheckoutSessionRequest, LineItem};
use crate::errors::ServiceError;
use crate::AppState;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

/// Payment rails offered on the hosted checkout page.
pub const CHECKOUT_PAYMENT_METHODS: &[&str] = &["card", "klarna", "afterpay_clearpay", "affirm"];

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    #[validate(length(min = 1))]
    pub package_id: String,
    #[validate(email)]
    pub customer_email: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionStatusQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub status: Option<String>,
    pub customer_email: Option<String>,
    pub amount_total: Option<i64>,
    pub metadata: BTreeMap<String, String>,
    pub payment_status: Option<String>,
}

/// Session and payment-intent metadata for a single-package purchase. The
/// webhook reads these keys off `checkout.session.completed` and
/// `payment_intent.*` events alike.
pub fn package_metadata(package: &catalog::Package) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("packageId".to_string(), package.id.to_string());
    metadata.insert("packageName".to_string(), package.name.to_string());
    metadata.insert(
        "totalSessions".to_string(),
        catalog::total_sessions(package).to_string(),
    );
    metadata
}

/// Create a processor-hosted checkout session for one package.
#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CreateCheckoutRequest,
    responses(
        (status = 200, description = "Hosted checkout session created", body = CreateCheckoutResponse),
        (status = 404, description = "Unknown package id"),
        (status = 502, description = "Payment processor error")
    ),
    tag = "checkout"
)]
#[instrument(skip(state, request), fields(package_id = %request.package_id))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, ServiceError> {
    request.validate()?;

    let package = catalog::package_by_id(&request.package_id).ok_or_else(|| {
        ServiceError::NotFound(format!("Package with id {} not found", request.package_id))
    })?;

    let base = state.config.public_base_url.trim_end_matches('/');
    let success_url = request
        .success_url
        .unwrap_or_else(|| format!("{base}/success?session_id={{CHECKOUT_SESSION_ID}}"));
    let cancel_url = request
        .cancel_url
        .unwrap_or_else(|| format!("{base}/packages"));

    let metadata = package_metadata(package);
    let session = state
        .gateway
        .create_checkout_session(CheckoutSessionRequest {
            line_items: vec![LineItem {
                name: package.name.to_string(),
                amount_cents: catalog::package_total_cents(package),
                quantity: 1,
            }],
            payment_method_types: CHECKOUT_PAYMENT_METHODS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            customer_email: request.customer_email,
            success_url,
            cancel_url,
            metadata: metadata.clone(),
            payment_intent_metadata: metadata,
        })
        .await?;

    let url = session.url.ok_or_else(|| {
        ServiceError::Provider("payment processor returned no redirect URL".to_string())
    })?;

    info!(session_id = %session.id, "checkout session created");
    Ok(Json(CreateCheckoutResponse {
        session_id: session.id,
        url,
    }))
}

/// Read back a checkout session for the post-redirect success page. Safe to
/// call repeatedly; the processor is authoritative.
#[utoipa::path(
    get,
    path = "/api/checkout",
    params(("session_id" = String, Query, description = "Checkout session id")),
    responses(
        (status = 200, description = "Session status", body = SessionStatusResponse),
        (status = 400, description = "Missing session_id parameter")
    ),
    tag = "checkout"
)]
#[instrument(skip(state, query))]
pub async fn get_checkout_session(
    State(state): State<AppState>,
    Query(query): Query<SessionStatusQuery>,
) -> Result<Json<SessionStatusResponse>, ServiceError> {
    let session_id = query
        .session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ServiceError::BadRequest("Missing session_id parameter".to_string()))?;

    let session = state.gateway.retrieve_checkout_session(&session_id).await?;

    Ok(Json(SessionStatusResponse {
        status: session.status.clone(),
        customer_email: session.effective_email().map(str::to_string),
        amount_total: session.amount_total,
        metadata: session.metadata.clone(),
        payment_status: session.payment_status,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_metadata_carries_id_name_and_sessions() {
        let package = catalog::package_by_id("brazilian-9").unwrap();
        let metadata = package_metadata(package);
        assert_eq!(metadata.get("packageId").map(String::as_str), Some("brazilian-9"));
        assert_eq!(
            metadata.get("packageName").map(String::as_str),
            Some("Brazilian Wax Package (9 + 3 Free)")
        );
        assert_eq!(metadata.get("totalSessions").map(String::as_str), Some("12"));
    }
}
