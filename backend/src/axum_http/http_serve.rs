use crate::{
    axum_http::{
        default_routers,
        error_responses::missing_stripe_key,
        routers::{self, checkout::CheckoutRouterState},
    },
    config::config_model::DotEnvyConfig,
    usecases::{
        check_access::CheckAccessUseCase, checkout::CheckoutUseCase,
        link_session::LinkSessionUseCase, stripe_webhook::StripeWebhookUseCase,
        subscription_cache::SubscriptionCache, subscription_source::SubscriptionSource,
    },
};
use anyhow::Result;
use axum::{
    Router,
    http::{
        Method,
        header::{CONTENT_TYPE, HeaderName},
    },
    routing::{get, post},
};
use paygate::{
    domain::repositories::cache_store::CacheStore,
    infra::cache::{kv_rest::KvRestStore, null::NullCacheStore},
    payments::{gateway::StripeGateway, stripe_client::StripeClient},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

pub async fn start(config: Arc<DotEnvyConfig>) -> Result<()> {
    let cache_store: Arc<dyn CacheStore> = match &config.kv {
        Some(kv) => {
            info!("http_serve: using KV REST subscription cache");
            Arc::new(KvRestStore::new(kv.url.clone(), kv.token.clone()))
        }
        None => {
            warn!("http_serve: KV_REST_API_URL not set, subscription cache disabled");
            Arc::new(NullCacheStore)
        }
    };

    let stripe_client = config.stripe.secret_key.as_ref().map(|secret_key| {
        Arc::new(StripeClient::with_api_base(
            secret_key.clone(),
            config.stripe.api_base.clone(),
        ))
    });
    if stripe_client.is_none() {
        warn!("http_serve: STRIPE_SECRET_KEY not set, stripe-backed routes will answer 500");
    }
    if config.stripe.webhook_secret.is_none() {
        warn!("http_serve: STRIPE_WEBHOOK_SECRET not set, webhook events will be ignored");
    }

    let app = build_router(&config, cache_store, stripe_client)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wires every route under `/api`. Without a Stripe client the Stripe-backed
/// routes answer with a misconfiguration error and check-access runs cache-only.
pub fn build_router<G>(
    config: &DotEnvyConfig,
    cache_store: Arc<dyn CacheStore>,
    stripe_client: Option<Arc<G>>,
) -> Result<Router>
where
    G: StripeGateway + 'static,
{
    let cache = SubscriptionCache::new(cache_store);

    let stripe_routes = match &stripe_client {
        Some(stripe_client) => Router::new()
            .merge(routers::checkout::routes(Arc::new(CheckoutRouterState {
                usecase: CheckoutUseCase::new(Arc::clone(stripe_client)),
                site_url: config.site.base_url.clone(),
            })))
            .merge(routers::link_session::routes(Arc::new(
                LinkSessionUseCase::new(Arc::clone(stripe_client), cache.clone()),
            )))
            .merge(routers::stripe_webhook::routes(Arc::new(
                StripeWebhookUseCase::new(
                    Arc::clone(stripe_client),
                    cache.clone(),
                    config.stripe.webhook_secret.clone(),
                ),
            ))),
        None => Router::new()
            .route("/create-checkout", post(missing_stripe_key))
            .route("/link-session", post(missing_stripe_key))
            .route("/stripe-webhook", post(missing_stripe_key)),
    };

    let source = stripe_client
        .map(|stripe_client| SubscriptionSource::new(stripe_client, cache.clone()));
    let request_timeout = Duration::from_secs(config.backend_server.timeout);
    let check_access = CheckAccessUseCase::new(cache, source)
        .with_lookup_timeout(lookup_budget(request_timeout));

    let api = Router::new()
        .merge(stripe_routes)
        .merge(routers::check_access::routes(Arc::new(check_access)))
        .route("/health-check", get(default_routers::health_check));

    let app = Router::new()
        .nest("/api", api)
        .fallback(default_routers::not_found)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes(
            config.backend_server.body_limit,
        )?))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([CONTENT_TYPE, HeaderName::from_static("stripe-signature")])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// Check-access must answer before the server-wide timeout turns it into a 408.
fn lookup_budget(request_timeout: Duration) -> Duration {
    request_timeout.mul_f64(0.8)
}

fn body_limit_bytes(body_limit_mib: u64) -> Result<usize> {
    let bytes = body_limit_mib
        .checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("SERVER_BODY_LIMIT of {} MiB is too large", body_limit_mib))?;

    Ok(usize::try_from(bytes)?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "http_serve: failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
