//! OpenAPI document and Swagger UI mount.

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::ErrorResponse;
use crate::handlers::bnpl::{CreateBnplSessionRequest, CreateBnplSessionResponse};
use crate::handlers::checkout::{
    CreateCheckoutRequest, CreateCheckoutResponse, SessionStatusResponse,
};
use crate::handlers::payment_intents::{CreatePaymentIntentRequest, CreatePaymentIntentResponse};
use crate::handlers::sms::{SendSmsRequest, SendSmsResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::checkout::create_checkout_session,
        crate::handlers::checkout::get_checkout_session,
        crate::handlers::bnpl::create_bnpl_session,
        crate::handlers::payment_intents::create_payment_intent,
        crate::handlers::stripe_webhook::receive,
        crate::handlers::cal_webhook::receive,
        crate::handlers::twilio_webhook::receive,
        crate::handlers::sms::send,
    ),
    components(schemas(
        ErrorResponse,
        CreateCheckoutRequest,
        CreateCheckoutResponse,
        SessionStatusResponse,
        CreateBnplSessionRequest,
        CreateBnplSessionResponse,
        CreatePaymentIntentRequest,
        CreatePaymentIntentResponse,
        SendSmsRequest,
        SendSmsResponse,
    )),
    tags(
        (name = "checkout", description = "Payment session and intent creation"),
        (name = "webhooks", description = "Signed provider callbacks"),
        (name = "sms", description = "Outbound SMS administration"),
    ),
    info(
        title = "Lumière Wax Studio API",
        description = "Checkout, payment webhooks, and booking notifications"
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
