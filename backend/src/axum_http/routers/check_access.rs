use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::header::CACHE_CONTROL,
    response::{IntoResponse, Response},
    routing::any,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use paygate::{
    domain::value_objects::subscriptions::AccessResponse, payments::gateway::StripeGateway,
};
use tracing::debug;

use crate::{axum_http::session_cookie, usecases::check_access::CheckAccessUseCase};

pub fn routes<G>(usecase: Arc<CheckAccessUseCase<G>>) -> Router
where
    G: StripeGateway + 'static,
{
    Router::new()
        .route("/check-access", any(check_access::<G>))
        .with_state(usecase)
}

/// Always answers 200; every failure along the way is a denial.
pub async fn check_access<G>(
    State(usecase): State<Arc<CheckAccessUseCase<G>>>,
    jar: CookieJar,
) -> Response
where
    G: StripeGateway + 'static,
{
    let response = match session_cookie::read(&jar) {
        Some(customer_id) => usecase.check(&customer_id, Utc::now()).await,
        None => {
            debug!("check_access: no session cookie");
            AccessResponse::denied()
        }
    };

    ([(CACHE_CONTROL, "no-store")], Json(response)).into_response()
}
