use std::sync::Arc;

use paygate::{
    domain::value_objects::{lookup::Lookup, subscriptions::SubscriptionState},
    payments::{gateway::StripeGateway, stripe_types::StripeSubscription},
};
use tracing::{debug, info, warn};

use crate::usecases::subscription_cache::SubscriptionCache;

/// How many subscriptions to consider when picking the one that represents a customer.
pub const SUBSCRIPTION_SCAN_LIMIT: u32 = 10;

/// Reads subscription state straight from Stripe and repopulates the cache.
pub struct SubscriptionSource<G>
where
    G: StripeGateway + 'static,
{
    stripe_client: Arc<G>,
    cache: SubscriptionCache,
}

impl<G> SubscriptionSource<G>
where
    G: StripeGateway + 'static,
{
    pub fn new(stripe_client: Arc<G>, cache: SubscriptionCache) -> Self {
        Self {
            stripe_client,
            cache,
        }
    }

    pub async fn fetch(&self, customer_id: &str) -> Lookup<SubscriptionState> {
        let subscriptions = match self
            .stripe_client
            .list_subscriptions(customer_id, SUBSCRIPTION_SCAN_LIMIT)
            .await
        {
            Ok(subscriptions) => subscriptions,
            Err(err) => {
                warn!(
                    %customer_id,
                    error = %err,
                    "subscription_source: failed to list subscriptions"
                );
                return Lookup::Failed(err);
            }
        };

        let Some(preferred) = pick_preferred(&subscriptions) else {
            debug!(%customer_id, "subscription_source: customer has no subscriptions");
            return Lookup::Absent;
        };

        let state = preferred.to_state();
        info!(
            %customer_id,
            subscription_id = ?preferred.id,
            status = %state.status,
            "subscription_source: state loaded from stripe"
        );

        self.cache.set(customer_id, &state).await;
        Lookup::Found(state)
    }
}

/// Prefers an `active`/`trialing` subscription, otherwise the first (newest) entry.
pub fn pick_preferred(subscriptions: &[StripeSubscription]) -> Option<&StripeSubscription> {
    subscriptions
        .iter()
        .find(|sub| sub.status.is_entitled())
        .or_else(|| subscriptions.first())
}
