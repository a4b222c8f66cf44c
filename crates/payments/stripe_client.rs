use std::time::Duration;

use anyhow::Result;
use reqwest::{
    StatusCode, Url,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::payments::stripe_types::{
    NewCheckoutSession, NewPrice, StripeCheckoutSession, StripeErrorEnvelope, StripeList,
    StripePrice, StripeProduct, StripeSubscription,
};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";
pub const API_VERSION: &str = "2024-06-20";
/// Upper bound for a single Stripe call, connect included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self::with_api_base(secret_key, DEFAULT_API_BASE.to_string())
    }

    pub fn with_api_base(secret_key: String, api_base: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "stripe client: falling back to a client without timeout");
                reqwest::Client::new()
            });

        Self {
            http,
            secret_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// `/v1/...` URL from path segments. Each segment is percent-encoded on its own,
    /// so an id can never step into a different resource.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        if let Some(segment) = segments
            .iter()
            .find(|segment| matches!(**segment, "" | "." | ".."))
        {
            anyhow::bail!("Invalid Stripe path segment: {:?}", segment);
        }

        let mut url = Url::parse(&self.api_base)?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Stripe API base cannot carry a path: {}", self.api_base))?
            .pop_if_empty()
            .push("v1")
            .extend(segments);
        Ok(url)
    }

    fn get(&self, segments: &[&str]) -> Result<reqwest::RequestBuilder> {
        Ok(self
            .http
            .get(self.url(segments)?)
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header("Stripe-Version", API_VERSION))
    }

    fn post(&self, segments: &[&str]) -> Result<reqwest::RequestBuilder> {
        Ok(self
            .http
            .post(self.url(segments)?)
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header("Stripe-Version", API_VERSION)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded"))
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .or_else(|| resp.headers().get("stripe-request-id"))
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (stripe_error_type, stripe_error_code, stripe_error_param, stripe_error_message) =
            match serde_json::from_str::<StripeErrorEnvelope>(&body) {
                Ok(envelope) => {
                    let details = envelope.error;
                    (details.type_, details.code, details.param, details.message)
                }
                Err(_) => (None, None, None, None),
            };

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?stripe_error_type,
            stripe_error_code = ?stripe_error_code,
            stripe_error_param = ?stripe_error_param,
            stripe_error_message = ?stripe_error_message,
            response_body = %body,
            context = %context,
            "stripe api request failed"
        );

        match stripe_error_message {
            Some(message) => anyhow::bail!(
                "Stripe API request failed: {}: {} (status {}, request_id={:?})",
                context,
                message,
                status,
                request_id
            ),
            None => anyhow::bail!(
                "Stripe API request failed: {} (status {}, request_id={:?})",
                context,
                status,
                request_id
            ),
        }
    }

    async fn send_json<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T> {
        let resp = request.send().await?;
        let resp = Self::ensure_success(resp, context).await?;
        Ok(resp.json().await?)
    }

    /// Lists a customer's subscriptions in any status, newest first.
    pub async fn list_subscriptions(
        &self,
        customer_id: &str,
        limit: u32,
    ) -> Result<Vec<StripeSubscription>> {
        // https://stripe.com/docs/api/subscriptions/list
        let request = self.get(&["subscriptions"])?.query(&[
            ("customer", customer_id.to_string()),
            ("status", "all".to_string()),
            ("limit", limit.to_string()),
        ]);
        let list: StripeList<StripeSubscription> =
            Self::send_json(request, "list subscriptions").await?;
        Ok(list.data)
    }

    pub async fn retrieve_subscription(&self, subscription_id: &str) -> Result<StripeSubscription> {
        // https://stripe.com/docs/api/subscriptions/retrieve
        let request = self.get(&["subscriptions", subscription_id])?;
        Self::send_json(request, "retrieve subscription").await
    }

    /// Retrieves a Checkout Session; `None` when Stripe does not know the id.
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<StripeCheckoutSession>> {
        // https://stripe.com/docs/api/checkout/sessions/retrieve
        let resp = self
            .get(&["checkout", "sessions", session_id])?
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(%session_id, "stripe checkout session not found");
            return Ok(None);
        }

        let resp = Self::ensure_success(resp, "retrieve checkout session").await?;
        Ok(Some(resp.json().await?))
    }

    pub async fn list_active_products(&self, limit: u32) -> Result<Vec<StripeProduct>> {
        // https://stripe.com/docs/api/products/list
        let request = self.get(&["products"])?.query(&[
            ("active", "true".to_string()),
            ("limit", limit.to_string()),
        ]);
        let list: StripeList<StripeProduct> = Self::send_json(request, "list products").await?;
        Ok(list.data)
    }

    pub async fn create_product(&self, name: &str, slug: &str) -> Result<StripeProduct> {
        // https://stripe.com/docs/api/products/create
        let body = [
            ("name", name.to_string()),
            ("metadata[slug]", slug.to_string()),
        ];
        let request = self
            .post(&["products"])?
            .header("Idempotency-Key", format!("product-{}", slug))
            .form(&body);
        Self::send_json(request, "create product").await
    }

    pub async fn list_active_prices(&self, product_id: &str, limit: u32) -> Result<Vec<StripePrice>> {
        // https://stripe.com/docs/api/prices/list
        let request = self.get(&["prices"])?.query(&[
            ("product", product_id.to_string()),
            ("active", "true".to_string()),
            ("limit", limit.to_string()),
        ]);
        let list: StripeList<StripePrice> = Self::send_json(request, "list prices").await?;
        Ok(list.data)
    }

    /// Creates a recurring price. The idempotency key is derived from the lookup key,
    /// so concurrent first-time calls resolve to the same price object.
    pub async fn create_price(&self, price: &NewPrice) -> Result<StripePrice> {
        // https://stripe.com/docs/api/prices/create
        let body = [
            ("product", price.product_id.clone()),
            ("currency", price.currency.to_string()),
            ("unit_amount", price.unit_amount.to_string()),
            ("recurring[interval]", price.interval.to_string()),
            ("lookup_key", price.lookup_key.to_string()),
            ("nickname", price.nickname.to_string()),
        ];
        let request = self
            .post(&["prices"])?
            .header(
                "Idempotency-Key",
                format!("price-{}-{}", price.product_id, price.lookup_key),
            )
            .form(&body);
        Self::send_json(request, "create price").await
    }

    /// Creates a Checkout Session and returns it; the hosted page URL is in `url`.
    pub async fn create_checkout_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<StripeCheckoutSession> {
        // Stripe Checkout docs:
        // https://stripe.com/docs/payments/checkout
        let mut body: Vec<(String, String)> = vec![
            ("mode".to_string(), session.mode.to_string()),
            ("line_items[0][price]".to_string(), session.price_id.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), session.success_url.clone()),
            ("cancel_url".to_string(), session.cancel_url.clone()),
        ];

        if session.allow_promotion_codes {
            body.push(("allow_promotion_codes".to_string(), "true".to_string()));
        }

        if let Some(days) = session.trial_period_days {
            body.push((
                "subscription_data[trial_period_days]".to_string(),
                days.to_string(),
            ));
        }

        let request = self.post(&["checkout", "sessions"])?.form(&body);
        Self::send_json(request, "create checkout session").await
    }
}
