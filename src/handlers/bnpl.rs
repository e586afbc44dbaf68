//! Buy-now-pay-later checkout sessions.

use crate::catalog;
use crate::clients::stripe::{CheckoutSessionRequest, LineItem};
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
pub struct CreateBnplSessionRequest {
    pub package_ids: Vec<String>,
    #[validate(email)]
    pub customer_email: String,
    #[validate(length(min = 1))]
    pub customer_name: String,
    pub payment_method: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBnplSessionResponse {
    pub url: String,
    pub session_id: String,
}

/// Maps a client-facing deferred-payment method name to the processor's
/// payment-method identifier. Exactly three rails are supported.
pub fn bnpl_method_id(method: &str) -> Option<&'static str> {
    match method.to_ascii_lowercase().as_str() {
        "klarna" => Some("klarna"),
        "affirm" => Some("affirm"),
        "afterpay" => Some("afterpay_clearpay"),
        _ => None,
    }
}

/// Resolves every package id or fails naming the first unknown one. No
/// provider call happens on partial resolution.
fn resolve_packages(ids: &[String]) -> Result<Vec<&'static catalog::Package>, ServiceError> {
    ids.iter()
        .map(|id| {
            catalog::package_by_id(id)
                .ok_or_else(|| ServiceError::NotFound(format!("Package with id {id} not found")))
        })
        .collect()
}

#[utoipa::path(
    post,
    path = "/api/create-bnpl-session",
    request_body = CreateBnplSessionRequest,
    responses(
        (status = 200, description = "BNPL checkout session created", body = CreateBnplSessionResponse),
        (status = 400, description = "Unsupported payment method or empty package list"),
        (status = 404, description = "Unknown package id")
    ),
    tag = "checkout"
)]
#[instrument(skip(state, request), fields(method = %request.payment_method))]
pub async fn create_bnpl_session(
    State(state): State<AppState>,
    Json(request): Json<CreateBnplSessionRequest>,
) -> Result<Json<CreateBnplSessionResponse>, ServiceError> {
    request.validate()?;

    if request.package_ids.is_empty() {
        return Err(ServiceError::InvalidInput(
            "At least one package id is required".to_string(),
        ));
    }
    let method = bnpl_method_id(&request.payment_method).ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "Unsupported payment method: {}. Supported: klarna, affirm, afterpay",
            request.payment_method
        ))
    })?;

    let packages = resolve_packages(&request.package_ids)?;
    let line_items = packages
        .iter()
        .map(|package| LineItem {
            name: package.name.to_string(),
            amount_cents: catalog::package_total_cents(package),
            quantity: 1,
        })
        .collect();

    let mut metadata = BTreeMap::new();
    metadata.insert("packageIds".to_string(), request.package_ids.join(","));
    metadata.insert("customerName".to_string(), request.customer_name.clone());
    metadata.insert("paymentMethod".to_string(), method.to_string());

    let base = state.config.public_base_url.trim_end_matches('/');
    let session = state
        .gateway
        .create_checkout_session(CheckoutSessionRequest {
            line_items,
            payment_method_types: vec![method.to_string()],
            customer_email: Some(request.customer_email),
            success_url: format!("{base}/success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{base}/packages"),
            metadata: metadata.clone(),
            payment_intent_metadata: metadata,
        })
        .await?;

    let url = session.url.ok_or_else(|| {
        ServiceError::Provider("payment processor returned no redirect URL".to_string())
    })?;

    info!(session_id = %session.id, method, "BNPL session created");
    Ok(Json(CreateBnplSessionResponse {
        url,
        session_id: session.id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn afterpay_maps_to_combined_identifier() {
        assert_eq!(bnpl_method_id("afterpay"), Some("afterpay_clearpay"));
        assert_eq!(bnpl_method_id("Klarna"), Some("klarna"));
        assert_eq!(bnpl_method_id("affirm"), Some("affirm"));
        assert_eq!(bnpl_method_id("venmo"), None);
    }

    #[test]
    fn resolution_fails_fast_on_first_unknown_id() {
        let err = resolve_packages(&[
            "brazilian-9".to_string(),
            "no-such".to_string(),
            "also-missing".to_string(),
        ])
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(msg) if msg.contains("no-such")));
    }
}
