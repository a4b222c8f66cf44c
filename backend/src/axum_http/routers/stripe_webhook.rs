use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use paygate::{
    domain::value_objects::subscriptions::{WebhookNotConfiguredResponse, WebhookReceivedResponse},
    payments::gateway::StripeGateway,
};

use crate::{
    axum_http::error_responses::error_response,
    usecases::stripe_webhook::{StripeWebhookUseCase, WebhookOutcome},
};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes<G>(usecase: Arc<StripeWebhookUseCase<G>>) -> Router
where
    G: StripeGateway + 'static,
{
    Router::new()
        .route("/stripe-webhook", post(stripe_webhook::<G>))
        .with_state(usecase)
}

/// Takes the body as raw bytes; the signature covers the exact payload Stripe sent.
pub async fn stripe_webhook<G>(
    State(usecase): State<Arc<StripeWebhookUseCase<G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    G: StripeGateway + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match usecase.handle(&body, signature, Utc::now()).await {
        Ok(WebhookOutcome::Received) => {
            Json(WebhookReceivedResponse { received: true }).into_response()
        }
        Ok(WebhookOutcome::NotConfigured) => Json(WebhookNotConfiguredResponse {
            ok: true,
            note: "No STRIPE_WEBHOOK_SECRET set",
        })
        .into_response(),
        Err(err) => error_response("stripe_webhook", err.status_code(), err.to_string()),
    }
}
