use std::sync::Arc;

use axum::http::StatusCode;
use paygate::{
    domain::value_objects::subscriptions::SubscriptionState,
    payments::{gateway::StripeGateway, stripe_types::Expandable},
};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::usecases::subscription_cache::SubscriptionCache;

#[derive(Debug, Error)]
pub enum LinkSessionError {
    #[error("Missing session_id")]
    MissingSessionId,
    #[error("Invalid session")]
    InvalidSession,
    #[error("{0}")]
    Upstream(anyhow::Error),
}

impl LinkSessionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LinkSessionError::MissingSessionId | LinkSessionError::InvalidSession => {
                StatusCode::BAD_REQUEST
            }
            LinkSessionError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkedSession {
    pub customer_id: String,
    pub subscription: Option<SubscriptionState>,
}

/// Turns a completed checkout session into a customer binding plus a warm cache entry.
pub struct LinkSessionUseCase<G>
where
    G: StripeGateway + 'static,
{
    stripe_client: Arc<G>,
    cache: SubscriptionCache,
}

impl<G> LinkSessionUseCase<G>
where
    G: StripeGateway + 'static,
{
    pub fn new(stripe_client: Arc<G>, cache: SubscriptionCache) -> Self {
        Self {
            stripe_client,
            cache,
        }
    }

    pub async fn link(&self, session_id: Option<&str>) -> Result<LinkedSession, LinkSessionError> {
        let session_id = session_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(LinkSessionError::MissingSessionId)?;

        if !is_well_formed_id(session_id) {
            warn!(%session_id, "link_session: rejecting malformed session id");
            return Err(LinkSessionError::InvalidSession);
        }

        let session = self
            .stripe_client
            .retrieve_checkout_session(session_id)
            .await
            .map_err(|err| {
                error!(
                    %session_id,
                    error = ?err,
                    "link_session: failed to retrieve checkout session"
                );
                LinkSessionError::Upstream(err)
            })?
            .ok_or_else(|| {
                warn!(%session_id, "link_session: checkout session not found");
                LinkSessionError::InvalidSession
            })?;

        let customer_id = session
            .customer
            .as_ref()
            .map(|customer| customer.id().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                warn!(%session_id, "link_session: checkout session has no customer");
                LinkSessionError::InvalidSession
            })?;

        let subscription = match session.subscription.as_ref() {
            Some(reference) => self.sync_subscription(&customer_id, reference).await,
            None => {
                info!(
                    %session_id,
                    %customer_id,
                    "link_session: no subscription on session, cache left untouched"
                );
                None
            }
        };

        info!(
            %session_id,
            %customer_id,
            has_subscription = subscription.is_some(),
            "link_session: session linked"
        );

        Ok(LinkedSession {
            customer_id,
            subscription,
        })
    }

    /// Fetches the exact subscription the checkout created. Failures only cost the warm cache.
    async fn sync_subscription(
        &self,
        customer_id: &str,
        reference: &Expandable,
    ) -> Option<SubscriptionState> {
        let subscription_id = reference.id();
        match self.stripe_client.retrieve_subscription(subscription_id).await {
            Ok(subscription) => self.cache.upsert_from_stripe(&subscription).await,
            Err(err) => {
                warn!(
                    %customer_id,
                    %subscription_id,
                    error = %err,
                    "link_session: failed to retrieve subscription"
                );
                None
            }
        }
    }
}

/// Stripe object ids are `prefix_` plus alphanumerics.
fn is_well_formed_id(id: &str) -> bool {
    id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
