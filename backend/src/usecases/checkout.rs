use std::sync::Arc;

use axum::http::StatusCode;
use paygate::{
    domain::value_objects::plans::{
        CURRENCY, PRICE_INTERVAL, PRODUCT_NAME, PRODUCT_SLUG, PlanId, PlanSpec,
    },
    payments::{
        gateway::StripeGateway,
        stripe_types::{NewCheckoutSession, NewPrice, StripePrice, StripeProduct},
    },
};
use thiserror::Error;
use tracing::{error, info};

const CATALOG_SCAN_LIMIT: u32 = 100;
const CHECKOUT_MODE: &str = "subscription";

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Unknown plan")]
    UnknownPlan,
    #[error("Unable to resolve site URL")]
    MissingSiteUrl,
    #[error("Stripe did not return a checkout URL")]
    MissingCheckoutUrl,
    #[error("{0}")]
    Upstream(anyhow::Error),
}

impl CheckoutError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CheckoutError::UnknownPlan => StatusCode::BAD_REQUEST,
            CheckoutError::MissingSiteUrl
            | CheckoutError::MissingCheckoutUrl
            | CheckoutError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub struct CheckoutUseCase<G>
where
    G: StripeGateway + 'static,
{
    stripe_client: Arc<G>,
}

impl<G> CheckoutUseCase<G>
where
    G: StripeGateway + 'static,
{
    pub fn new(stripe_client: Arc<G>) -> Self {
        Self { stripe_client }
    }

    /// Provisions the catalog entry for `plan` if needed and opens a checkout session.
    ///
    /// Returns the hosted checkout URL.
    pub async fn create_checkout(
        &self,
        plan: Option<&str>,
        site_url: Option<&str>,
    ) -> Result<String, CheckoutError> {
        let plan = plan
            .and_then(PlanId::from_str)
            .ok_or(CheckoutError::UnknownPlan)?;
        let site_url = site_url
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or(CheckoutError::MissingSiteUrl)?;
        let spec = plan.spec();

        let product = self.ensure_product().await.map_err(upstream("product"))?;
        let price = self
            .ensure_price(&product.id, spec)
            .await
            .map_err(upstream("price"))?;

        let request = NewCheckoutSession {
            mode: CHECKOUT_MODE,
            price_id: price.id,
            success_url: format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", site_url),
            cancel_url: format!("{}/#pricing", site_url),
            allow_promotion_codes: true,
            trial_period_days: spec.trial_period_days,
        };

        let session = self
            .stripe_client
            .create_checkout_session(&request)
            .await
            .map_err(upstream("checkout session"))?;

        let url = session.url.ok_or_else(|| {
            error!(session_id = ?session.id, "checkout: session created without url");
            CheckoutError::MissingCheckoutUrl
        })?;

        info!(
            %plan,
            session_id = ?session.id,
            trial_period_days = ?spec.trial_period_days,
            "checkout: session created"
        );
        Ok(url)
    }

    pub async fn ensure_product(&self) -> anyhow::Result<StripeProduct> {
        let products = self
            .stripe_client
            .list_active_products(CATALOG_SCAN_LIMIT)
            .await?;

        let existing = products
            .iter()
            .find(|product| {
                product.metadata.get("slug").map(String::as_str) == Some(PRODUCT_SLUG)
            })
            .or_else(|| products.iter().find(|product| product.name == PRODUCT_NAME));

        if let Some(product) = existing {
            return Ok(product.clone());
        }

        info!(name = PRODUCT_NAME, "checkout: creating product");
        self.stripe_client
            .create_product(PRODUCT_NAME, PRODUCT_SLUG)
            .await
    }

    pub async fn ensure_price(
        &self,
        product_id: &str,
        spec: &PlanSpec,
    ) -> anyhow::Result<StripePrice> {
        let prices = self
            .stripe_client
            .list_active_prices(product_id, CATALOG_SCAN_LIMIT)
            .await?;

        if let Some(price) = prices.into_iter().find(|price| price_matches(price, spec)) {
            return Ok(price);
        }

        info!(
            %product_id,
            lookup_key = spec.lookup_key,
            unit_amount = spec.amount_minor,
            "checkout: creating price"
        );
        self.stripe_client
            .create_price(&NewPrice {
                product_id: product_id.to_string(),
                currency: CURRENCY,
                unit_amount: spec.amount_minor,
                interval: PRICE_INTERVAL,
                lookup_key: spec.lookup_key,
                nickname: spec.nickname,
            })
            .await
    }
}

fn price_matches(price: &StripePrice, spec: &PlanSpec) -> bool {
    price.lookup_key.as_deref() == Some(spec.lookup_key)
        && price.currency.eq_ignore_ascii_case(CURRENCY)
        && price
            .recurring
            .as_ref()
            .is_some_and(|recurring| recurring.interval == PRICE_INTERVAL)
}

fn upstream(step: &'static str) -> impl Fn(anyhow::Error) -> CheckoutError {
    move |err| {
        error!(step, error = ?err, "checkout: stripe call failed");
        CheckoutError::Upstream(err)
    }
}
