//! Client-confirmable payment intents for the embedded card form.

use crate::catalog;
use crate::clients::stripe::PaymentIntentRequest;
use crate::errors::ServiceError;
use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    pub package_ids: Vec<String>,
    #[validate(email)]
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    /// Single-use confirmation secret. Echoed to the requesting client only;
    /// never logged.
    pub client_secret: String,
    pub payment_intent_id: String,
}

#[utoipa::path(
    post,
    path = "/api/create-payment-intent",
    request_body = CreatePaymentIntentRequest,
    responses(
        (status = 200, description = "Payment intent created", body = CreatePaymentIntentResponse),
        (status = 400, description = "Unknown package ids or non-positive total")
    ),
    tag = "checkout"
)]
#[instrument(skip_all, fields(package_count = request.package_ids.len()))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentIntentRequest>,
) -> Result<Json<CreatePaymentIntentResponse>, ServiceError> {
    request.validate()?;

    if request.package_ids.is_empty() {
        return Err(ServiceError::InvalidInput(
            "At least one package id is required".to_string(),
        ));
    }

    // All-or-nothing resolution: a partial match must not create a provider
    // resource.
    let packages: Vec<&catalog::Package> = request
        .package_ids
        .iter()
        .filter_map(|id| catalog::package_by_id(id))
        .collect();
    if packages.len() != request.package_ids.len() {
        let unknown: Vec<&str> = request
            .package_ids
            .iter()
            .filter(|id| catalog::package_by_id(id).is_none())
            .map(String::as_str)
            .collect();
        return Err(ServiceError::InvalidInput(format!(
            "Unknown package ids: {}",
            unknown.join(", ")
        )));
    }

    let amount_cents: i64 = packages.iter().map(|p| catalog::package_total_cents(p)).sum();
    if amount_cents <= 0 {
        return Err(ServiceError::InvalidAmount(format!(
            "Computed total must be positive, got {amount_cents}"
        )));
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("packageIds".to_string(), request.package_ids.join(","));
    if let Some(name) = &request.customer_name {
        metadata.insert("customerName".to_string(), name.clone());
    }
    if let Some(phone) = &request.customer_phone {
        metadata.insert("customerPhone".to_string(), phone.clone());
    }

    let intent = state
        .gateway
        .create_payment_intent(PaymentIntentRequest {
            amount_cents,
            currency: "usd".to_string(),
            receipt_email: request.customer_email,
            metadata,
        })
        .await?;

    info!(payment_intent_id = %intent.id, amount_cents, "payment intent created");
    Ok(Json(CreatePaymentIntentResponse {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
    }))
}
