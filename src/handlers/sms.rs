//! Admin SMS endpoint, guarded by a static API key.

use crate::errors::ServiceError;
use crate::webhooks::constant_time_eq;
use crate::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendSmsRequest {
    #[validate(length(min = 1))]
    pub to: String,
    #[validate(length(min = 1))]
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendSmsResponse {
    pub success: bool,
    pub message_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/sms/send",
    request_body = SendSmsRequest,
    responses(
        (status = 200, description = "Message queued", body = SendSmsResponse),
        (status = 400, description = "Missing destination or message"),
        (status = 401, description = "Missing or invalid API key")
    ),
    tag = "sms"
)]
#[instrument(skip_all)]
pub async fn send(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SendSmsRequest>,
) -> Result<Json<SendSmsResponse>, ServiceError> {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized("Missing API key".to_string()))?;
    if !constant_time_eq(provided, &state.config.admin_api_key) {
        return Err(ServiceError::Unauthorized("Invalid API key".to_string()));
    }

    request.validate().map_err(|_| {
        ServiceError::InvalidInput("Both 'to' and 'message' are required".to_string())
    })?;

    let outcome = state.notifier.send_custom(&request.to, &request.message).await;
    if !outcome.success {
        let message = outcome
            .error
            .unwrap_or_else(|| "SMS send failed".to_string());
        return if message.contains("not configured") {
            Err(ServiceError::Configuration(message))
        } else {
            Err(ServiceError::Provider(message))
        };
    }

    info!(message_id = ?outcome.message_id, "admin SMS sent");
    Ok(Json(SendSmsResponse {
        success: true,
        message_id: outcome.message_id,
    }))
}
