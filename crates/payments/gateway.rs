use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::payments::{
    stripe_client::StripeClient,
    stripe_types::{
        NewCheckoutSession, NewPrice, StripeCheckoutSession, StripePrice, StripeProduct,
        StripeSubscription,
    },
};

/// The slice of the Stripe API the handlers depend on.
#[automock]
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn list_subscriptions(
        &self,
        customer_id: &str,
        limit: u32,
    ) -> Result<Vec<StripeSubscription>>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<StripeSubscription>;

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<StripeCheckoutSession>>;

    async fn list_active_products(&self, limit: u32) -> Result<Vec<StripeProduct>>;

    async fn create_product(&self, name: &str, slug: &str) -> Result<StripeProduct>;

    async fn list_active_prices(&self, product_id: &str, limit: u32) -> Result<Vec<StripePrice>>;

    async fn create_price(&self, price: &NewPrice) -> Result<StripePrice>;

    async fn create_checkout_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<StripeCheckoutSession>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn list_subscriptions(
        &self,
        customer_id: &str,
        limit: u32,
    ) -> Result<Vec<StripeSubscription>> {
        self.list_subscriptions(customer_id, limit).await
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<StripeSubscription> {
        self.retrieve_subscription(subscription_id).await
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<StripeCheckoutSession>> {
        self.retrieve_checkout_session(session_id).await
    }

    async fn list_active_products(&self, limit: u32) -> Result<Vec<StripeProduct>> {
        self.list_active_products(limit).await
    }

    async fn create_product(&self, name: &str, slug: &str) -> Result<StripeProduct> {
        self.create_product(name, slug).await
    }

    async fn list_active_prices(&self, product_id: &str, limit: u32) -> Result<Vec<StripePrice>> {
        self.list_active_prices(product_id, limit).await
    }

    async fn create_price(&self, price: &NewPrice) -> Result<StripePrice> {
        self.create_price(price).await
    }

    async fn create_checkout_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<StripeCheckoutSession> {
        self.create_checkout_session(session).await
    }
}
