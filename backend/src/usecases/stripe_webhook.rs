use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use paygate::payments::{
    gateway::StripeGateway,
    stripe_types::{StripeCheckoutSession, StripeEvent, StripeSubscription},
    webhook_signature::{self, SignatureError},
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::usecases::subscription_cache::SubscriptionCache;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing stripe-signature header")]
    MissingSignature,
    #[error("Webhook Error: {0}")]
    InvalidSignature(#[from] SignatureError),
    #[error("Webhook handler failed: {0}")]
    Dispatch(String),
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature | WebhookError::InvalidSignature(_) => {
                StatusCode::BAD_REQUEST
            }
            // Stripe redelivers on 5xx.
            WebhookError::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// No signing secret configured: acknowledged, nothing processed.
    NotConfigured,
    Received,
}

/// Keeps the subscription cache in step with Stripe's lifecycle events.
pub struct StripeWebhookUseCase<G>
where
    G: StripeGateway + 'static,
{
    stripe_client: Arc<G>,
    cache: SubscriptionCache,
    webhook_secret: Option<String>,
}

impl<G> StripeWebhookUseCase<G>
where
    G: StripeGateway + 'static,
{
    pub fn new(
        stripe_client: Arc<G>,
        cache: SubscriptionCache,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            stripe_client,
            cache,
            webhook_secret,
        }
    }

    pub async fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<WebhookOutcome, WebhookError> {
        let Some(secret) = self.webhook_secret.as_deref() else {
            warn!("stripe_webhook: STRIPE_WEBHOOK_SECRET not set, event ignored");
            return Ok(WebhookOutcome::NotConfigured);
        };

        let signature = signature
            .filter(|value| !value.trim().is_empty())
            .ok_or(WebhookError::MissingSignature)?;

        let event = webhook_signature::construct_event(payload, signature, secret, now)
            .map_err(|err| {
                warn!(
                    error = %err,
                    status = StatusCode::BAD_REQUEST.as_u16(),
                    "stripe_webhook: verification failed"
                );
                WebhookError::InvalidSignature(err)
            })?;

        info!(
            event_id = ?event.id,
            event_type = %event.type_,
            "stripe_webhook: event verified"
        );

        self.dispatch(&event).await?;
        Ok(WebhookOutcome::Received)
    }

    async fn dispatch(&self, event: &StripeEvent) -> Result<(), WebhookError> {
        match event.type_.as_str() {
            "checkout.session.completed" => self.handle_checkout_completed(event).await,
            "customer.subscription.created"
            | "customer.subscription.updated"
            | "customer.subscription.deleted" => self.handle_subscription_change(event).await,
            _ => {
                debug!(event_type = %event.type_, "stripe_webhook: unhandled event type");
                Ok(())
            }
        }
    }

    async fn handle_checkout_completed(&self, event: &StripeEvent) -> Result<(), WebhookError> {
        let session: StripeCheckoutSession = serde_json::from_value(event.data.object.clone())
            .map_err(|err| {
                error!(
                    event_id = ?event.id,
                    error = %err,
                    "stripe_webhook: invalid checkout session payload"
                );
                WebhookError::Dispatch(format!("invalid checkout session payload: {err}"))
            })?;

        let Some(reference) = session.subscription.as_ref() else {
            debug!(
                session_id = ?session.id,
                "stripe_webhook: checkout session without subscription"
            );
            return Ok(());
        };

        let subscription_id = reference.id();
        match self.stripe_client.retrieve_subscription(subscription_id).await {
            Ok(subscription) => {
                self.cache.upsert_from_stripe(&subscription).await;
            }
            Err(err) => {
                // The matching customer.subscription.* event carries the same state.
                warn!(
                    %subscription_id,
                    error = %err,
                    "stripe_webhook: failed to retrieve subscription for completed checkout"
                );
            }
        }

        Ok(())
    }

    async fn handle_subscription_change(&self, event: &StripeEvent) -> Result<(), WebhookError> {
        let subscription: StripeSubscription = serde_json::from_value(event.data.object.clone())
            .map_err(|err| {
                error!(
                    event_id = ?event.id,
                    event_type = %event.type_,
                    error = %err,
                    "stripe_webhook: invalid subscription payload"
                );
                WebhookError::Dispatch(format!("invalid subscription payload: {err}"))
            })?;

        if let Some(state) = self.cache.upsert_from_stripe(&subscription).await {
            info!(
                subscription_id = ?subscription.id,
                customer_id = ?subscription.customer_id(),
                status = %state.status,
                "stripe_webhook: subscription state synced"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::subscription_cache::tests::MemoryCacheStore;
    use chrono::TimeZone;
    use paygate::{
        domain::{
            repositories::cache_store::MockCacheStore,
            value_objects::enums::subscription_statuses::SubscriptionStatus,
        },
        payments::{
            gateway::MockStripeGateway, stripe_types::Expandable,
            webhook_signature::signature_header,
        },
    };
    use serde_json::json;

    const SECRET: &str = "whsec_test";

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_792_000_000, 0).unwrap()
    }

    fn signed(event: serde_json::Value) -> (Vec<u8>, String) {
        let payload = serde_json::to_vec(&event).unwrap();
        let header = signature_header(&payload, SECRET, now().timestamp()).unwrap();
        (payload, header)
    }

    fn memory_cache() -> (SubscriptionCache, Arc<MemoryCacheStore>) {
        let store = Arc::new(MemoryCacheStore::default());
        (SubscriptionCache::new(store.clone()), store)
    }

    fn usecase(
        stripe: MockStripeGateway,
        cache: SubscriptionCache,
    ) -> StripeWebhookUseCase<MockStripeGateway> {
        StripeWebhookUseCase::new(Arc::new(stripe), cache, Some(SECRET.to_string()))
    }

    #[tokio::test]
    async fn unconfigured_secret_is_a_no_op() {
        let mut store = MockCacheStore::new();
        store.expect_set().never();
        let usecase = StripeWebhookUseCase::new(
            Arc::new(MockStripeGateway::new()),
            SubscriptionCache::new(Arc::new(store)),
            None,
        );

        let outcome = usecase.handle(b"{}", None, now()).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::NotConfigured);
    }

    #[tokio::test]
    async fn missing_signature_is_rejected() {
        let (cache, _) = memory_cache();
        let err = usecase(MockStripeGateway::new(), cache)
            .handle(b"{}", None, now())
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::MissingSignature));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_signature_leaves_cache_untouched() {
        let (payload, _) = signed(json!({
            "id": "evt_1",
            "type": "customer.subscription.updated",
            "data": {"object": {"customer": "cus_1", "status": "active"}}
        }));
        let forged =
            signature_header(&payload, "whsec_attacker", now().timestamp()).unwrap();

        let mut store = MockCacheStore::new();
        store.expect_set().never();
        let err = usecase(MockStripeGateway::new(), SubscriptionCache::new(Arc::new(store)))
            .handle(&payload, Some(&forged), now())
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::InvalidSignature(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("Webhook Error:"));
    }

    #[tokio::test]
    async fn subscription_events_upsert_the_embedded_object() {
        let (payload, header) = signed(json!({
            "id": "evt_2",
            "type": "customer.subscription.deleted",
            "data": {"object": {
                "id": "sub_1",
                "object": "subscription",
                "customer": "cus_1",
                "status": "canceled",
                "current_period_end": 1_793_318_400,
                "trial_end": null
            }}
        }));
        let mut stripe = MockStripeGateway::new();
        stripe.expect_retrieve_subscription().never();
        let (cache, _) = memory_cache();

        let outcome = usecase(stripe, cache.clone())
            .handle(&payload, Some(&header), now())
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Received);
        let state = cache.get("cus_1").await.found().unwrap();
        assert_eq!(state.status, SubscriptionStatus::Canceled);
    }

    #[tokio::test]
    async fn completed_checkout_retrieves_the_referenced_subscription() {
        let (payload, header) = signed(json!({
            "id": "evt_3",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_1",
                "object": "checkout.session",
                "customer": "cus_1",
                "subscription": "sub_1"
            }}
        }));
        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_retrieve_subscription()
            .withf(|id| id == "sub_1")
            .times(1)
            .returning(|_| {
                Ok(StripeSubscription {
                    id: Some("sub_1".to_string()),
                    customer: Some(Expandable::Id("cus_1".to_string())),
                    status: SubscriptionStatus::Active,
                    current_period_end: Some(1_793_318_400),
                    trial_end: None,
                    items: Default::default(),
                })
            });
        let (cache, _) = memory_cache();

        usecase(stripe, cache.clone())
            .handle(&payload, Some(&header), now())
            .await
            .unwrap();

        let state = cache.get("cus_1").await.found().unwrap();
        assert_eq!(state.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn completed_checkout_without_subscription_is_acknowledged() {
        let (payload, header) = signed(json!({
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_1", "customer": "cus_1", "subscription": null}}
        }));
        let mut stripe = MockStripeGateway::new();
        stripe.expect_retrieve_subscription().never();
        let (cache, store) = memory_cache();

        let outcome = usecase(stripe, cache)
            .handle(&payload, Some(&header), now())
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Received);
        assert!(store.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_events_are_acknowledged() {
        let (payload, header) = signed(json!({
            "type": "invoice.paid",
            "data": {"object": {"id": "in_1"}}
        }));
        let (cache, store) = memory_cache();

        let outcome = usecase(MockStripeGateway::new(), cache)
            .handle(&payload, Some(&header), now())
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Received);
        assert!(store.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscription_without_customer_is_skipped() {
        let (payload, header) = signed(json!({
            "type": "customer.subscription.updated",
            "data": {"object": {"id": "sub_1", "status": "active"}}
        }));
        let (cache, store) = memory_cache();

        usecase(MockStripeGateway::new(), cache)
            .handle(&payload, Some(&header), now())
            .await
            .unwrap();

        assert!(store.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_subscription_payload_is_a_server_error() {
        let (payload, header) = signed(json!({
            "type": "customer.subscription.updated",
            "data": {"object": {"id": "sub_1", "customer": "cus_1"}}
        }));
        let (cache, _) = memory_cache();

        let err = usecase(MockStripeGateway::new(), cache)
            .handle(&payload, Some(&header), now())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
