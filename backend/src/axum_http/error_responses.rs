use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

pub const MISSING_STRIPE_KEY_MESSAGE: &str =
    "Missing STRIPE_SECRET_KEY. Set it in the environment (or .env) and restart the service.";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

/// Logs the failure under `label` and renders the JSON error body.
pub fn error_response(label: &str, status: StatusCode, message: impl Into<String>) -> Response {
    let message = message.into();
    if status.is_server_error() {
        error!(status = status.as_u16(), error = %message, "{}: request failed", label);
    } else {
        warn!(status = status.as_u16(), error = %message, "{}: request rejected", label);
    }

    let body = Json(ErrorResponse {
        code: status.as_u16(),
        message,
    });

    (status, body).into_response()
}

/// Stands in for every Stripe-backed handler while no secret key is configured.
pub async fn missing_stripe_key() -> Response {
    error_response(
        "stripe",
        StatusCode::INTERNAL_SERVER_ERROR,
        MISSING_STRIPE_KEY_MESSAGE,
    )
}
