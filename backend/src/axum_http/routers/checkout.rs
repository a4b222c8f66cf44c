use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
};
use paygate::{
    domain::value_objects::subscriptions::{CreateCheckoutRequest, CreateCheckoutResponse},
    payments::gateway::StripeGateway,
};

use crate::{
    axum_http::{error_responses::error_response, site_url::resolve_site_url},
    usecases::checkout::CheckoutUseCase,
};

pub struct CheckoutRouterState<G>
where
    G: StripeGateway + 'static,
{
    pub usecase: CheckoutUseCase<G>,
    /// Configured public base URL; request headers are used when unset.
    pub site_url: Option<String>,
}

pub fn routes<G>(state: Arc<CheckoutRouterState<G>>) -> Router
where
    G: StripeGateway + 'static,
{
    Router::new()
        .route("/create-checkout", post(create_checkout::<G>))
        .with_state(state)
}

pub async fn create_checkout<G>(
    State(state): State<Arc<CheckoutRouterState<G>>>,
    headers: HeaderMap,
    payload: Result<Json<CreateCheckoutRequest>, JsonRejection>,
) -> Response
where
    G: StripeGateway + 'static,
{
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let site_url = resolve_site_url(state.site_url.as_deref(), &headers);

    match state
        .usecase
        .create_checkout(request.plan.as_deref(), site_url.as_deref())
        .await
    {
        Ok(url) => Json(CreateCheckoutResponse { url }).into_response(),
        Err(err) => error_response("create_checkout", err.status_code(), err.to_string()),
    }
}
