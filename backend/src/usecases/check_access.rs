use chrono::{DateTime, Utc};
use paygate::{
    domain::value_objects::{
        lookup::Lookup,
        subscriptions::{AccessResponse, SubscriptionState},
    },
    payments::gateway::StripeGateway,
};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::usecases::{
    subscription_cache::SubscriptionCache, subscription_source::SubscriptionSource,
};

/// Budget for the whole cache + Stripe resolution when none is configured.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Cache first, Stripe second, deny otherwise.
pub struct CheckAccessUseCase<G>
where
    G: StripeGateway + 'static,
{
    cache: SubscriptionCache,
    source: Option<SubscriptionSource<G>>,
    lookup_timeout: Duration,
}

impl<G> CheckAccessUseCase<G>
where
    G: StripeGateway + 'static,
{
    /// `source` is `None` when no Stripe key is configured; lookups then stop at the cache.
    pub fn new(cache: SubscriptionCache, source: Option<SubscriptionSource<G>>) -> Self {
        Self {
            cache,
            source,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// A lookup still running after `lookup_timeout` is abandoned and denied.
    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    pub async fn check(&self, customer_id: &str, now: DateTime<Utc>) -> AccessResponse {
        let resolved =
            tokio::time::timeout(self.lookup_timeout, self.resolve_state(customer_id)).await;

        let state = match resolved {
            Ok(Some(state)) => state,
            Ok(None) => {
                info!(%customer_id, "check_access: no subscription state, denying");
                return AccessResponse::denied();
            }
            Err(_) => {
                warn!(
                    %customer_id,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "check_access: lookup timed out, denying"
                );
                return AccessResponse::denied();
            }
        };

        let response = AccessResponse::evaluate(&state, now);
        info!(
            %customer_id,
            has_access = response.has_access,
            status = %state.status,
            "check_access: decision made"
        );
        response
    }

    async fn resolve_state(&self, customer_id: &str) -> Option<SubscriptionState> {
        match self.cache.get(customer_id).await {
            Lookup::Found(state) => {
                debug!(%customer_id, "check_access: cache hit");
                return Some(state);
            }
            Lookup::Absent => debug!(%customer_id, "check_access: cache miss"),
            Lookup::Failed(err) => {
                warn!(%customer_id, error = %err, "check_access: cache unavailable");
            }
        }

        let source = self.source.as_ref()?;
        match source.fetch(customer_id).await {
            Lookup::Found(state) => Some(state),
            Lookup::Absent => None,
            Lookup::Failed(err) => {
                warn!(%customer_id, error = %err, "check_access: stripe fallback failed");
                None
            }
        }
    }
}
