use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::post,
};
use axum_extra::extract::cookie::CookieJar;
use paygate::{
    domain::value_objects::subscriptions::{LinkSessionRequest, LinkSessionResponse},
    payments::gateway::StripeGateway,
};

use crate::{
    axum_http::{error_responses::error_response, session_cookie},
    usecases::link_session::LinkSessionUseCase,
};

pub fn routes<G>(usecase: Arc<LinkSessionUseCase<G>>) -> Router
where
    G: StripeGateway + 'static,
{
    Router::new()
        .route("/link-session", post(link_session::<G>))
        .with_state(usecase)
}

pub async fn link_session<G>(
    State(usecase): State<Arc<LinkSessionUseCase<G>>>,
    jar: CookieJar,
    payload: Result<Json<LinkSessionRequest>, JsonRejection>,
) -> Response
where
    G: StripeGateway + 'static,
{
    // An unreadable body is treated like one without a session id.
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    match usecase.link(request.session_id.as_deref()).await {
        Ok(linked) => {
            let jar = jar.add(session_cookie::build(linked.customer_id.clone()));
            let body = LinkSessionResponse {
                ok: true,
                customer_id: linked.customer_id,
                sub: linked.subscription,
            };
            (jar, Json(body)).into_response()
        }
        Err(err) => error_response("link_session", err.status_code(), err.to_string()),
    }
}
