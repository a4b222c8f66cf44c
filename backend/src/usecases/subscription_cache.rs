use std::sync::Arc;

use paygate::{
    domain::{
        repositories::cache_store::CacheStore,
        value_objects::{lookup::Lookup, subscriptions::SubscriptionState},
    },
    payments::stripe_types::StripeSubscription,
};
use serde_json::Value;
use tracing::{debug, warn};

pub fn cache_key(customer_id: &str) -> String {
    format!("sub:customer:{}", customer_id)
}

/// Customer-keyed view over the raw cache store.
///
/// Never fails its callers: store errors come back as `Lookup::Failed` on reads
/// and are logged and dropped on writes.
#[derive(Clone)]
pub struct SubscriptionCache {
    store: Arc<dyn CacheStore>,
}

impl SubscriptionCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, customer_id: &str) -> Lookup<SubscriptionState> {
        let key = cache_key(customer_id);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Lookup::Absent,
            Err(err) => {
                warn!(%customer_id, error = %err, "subscription_cache: read failed");
                return Lookup::Failed(err);
            }
        };

        match decode_state(raw) {
            Some(state) => Lookup::Found(state),
            None => {
                warn!(%customer_id, "subscription_cache: ignoring malformed cached value");
                Lookup::Absent
            }
        }
    }

    /// Overwrites the customer's entry. Returns whether the write reached the store.
    pub async fn set(&self, customer_id: &str, state: &SubscriptionState) -> bool {
        let value = match serde_json::to_value(state) {
            Ok(value) => value,
            Err(err) => {
                warn!(%customer_id, error = %err, "subscription_cache: failed to encode state");
                return false;
            }
        };

        match self.store.set(&cache_key(customer_id), &value).await {
            Ok(()) => {
                debug!(
                    %customer_id,
                    status = %state.status,
                    "subscription_cache: state stored"
                );
                true
            }
            Err(err) => {
                warn!(%customer_id, error = %err, "subscription_cache: write failed");
                false
            }
        }
    }

    /// Normalizes a Stripe subscription and writes it under its customer.
    ///
    /// Returns `None` when the subscription has no resolvable customer; the
    /// normalized state is returned even if the cache write itself failed.
    pub async fn upsert_from_stripe(
        &self,
        subscription: &StripeSubscription,
    ) -> Option<SubscriptionState> {
        let Some(customer_id) = subscription.customer_id() else {
            debug!(
                subscription_id = ?subscription.id,
                "subscription_cache: subscription has no customer, skipping upsert"
            );
            return None;
        };

        let state = subscription.to_state();
        self.set(customer_id, &state).await;
        Some(state)
    }
}

/// Accepts both a pre-serialized JSON string and a structured document.
fn decode_state(raw: Value) -> Option<SubscriptionState> {
    match raw {
        Value::String(encoded) => serde_json::from_str(&encoded).ok(),
        Value::Object(_) => serde_json::from_value(raw).ok(),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use paygate::domain::{
        repositories::cache_store::MockCacheStore,
        value_objects::enums::subscription_statuses::SubscriptionStatus,
    };
    use serde_json::json;
    use std::{collections::HashMap, sync::Mutex};

    /// HashMap-backed store for tests that care about what ends up cached.
    #[derive(Default)]
    pub(crate) struct MemoryCacheStore {
        pub(crate) entries: Mutex<HashMap<String, Value>>,
    }

    #[async_trait]
    impl CacheStore for MemoryCacheStore {
        async fn get(&self, key: &str) -> Result<Option<Value>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &Value) -> Result<()> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.clone());
            Ok(())
        }
    }

    fn active_state() -> SubscriptionState {
        SubscriptionState {
            status: SubscriptionStatus::Active,
            current_period_end: Utc.with_ymd_and_hms(2026, 11, 17, 0, 0, 0).single(),
            trial_end: None,
        }
    }

    fn cache_returning(value: Option<Value>) -> SubscriptionCache {
        let mut store = MockCacheStore::new();
        store
            .expect_get()
            .withf(|key| key == "sub:customer:cus_1")
            .returning(move |_| Ok(value.clone()));
        SubscriptionCache::new(Arc::new(store))
    }

    #[tokio::test]
    async fn reads_string_encoded_values() {
        let cache = cache_returning(Some(Value::String(
            r#"{"status":"active","currentPeriodEnd":"2026-11-17T00:00:00.000Z","trialEnd":null}"#
                .to_string(),
        )));

        let state = cache.get("cus_1").await.found().unwrap();
        assert_eq!(state, active_state());
    }

    #[tokio::test]
    async fn reads_structured_values() {
        let cache = cache_returning(Some(json!({
            "status": "trialing",
            "currentPeriodEnd": null,
            "trialEnd": "2026-10-24T00:00:00Z"
        })));

        let state = cache.get("cus_1").await.found().unwrap();
        assert_eq!(state.status, SubscriptionStatus::Trialing);
        assert!(state.trial_end.is_some());
    }

    #[tokio::test]
    async fn malformed_values_are_absent() {
        for raw in [
            Value::String("not json".to_string()),
            json!({"currentPeriodEnd": 12}),
            json!(42),
        ] {
            let cache = cache_returning(Some(raw));
            assert!(matches!(cache.get("cus_1").await, Lookup::Absent));
        }
    }

    #[tokio::test]
    async fn store_errors_are_reported_as_failed() {
        let mut store = MockCacheStore::new();
        store
            .expect_get()
            .returning(|_| Err(anyhow::anyhow!("connection refused")));
        let cache = SubscriptionCache::new(Arc::new(store));

        assert!(matches!(cache.get("cus_1").await, Lookup::Failed(_)));
    }

    #[tokio::test]
    async fn failed_writes_do_not_propagate() {
        let mut store = MockCacheStore::new();
        store
            .expect_set()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("read only replica")));
        let cache = SubscriptionCache::new(Arc::new(store));

        assert!(!cache.set("cus_1", &active_state()).await);
    }

    #[tokio::test]
    async fn upserting_the_same_state_twice_stores_one_value() {
        let store = Arc::new(MemoryCacheStore::default());
        let cache = SubscriptionCache::new(store.clone());

        assert!(cache.set("cus_1", &active_state()).await);
        let first = store.entries.lock().unwrap().clone();
        assert!(cache.set("cus_1", &active_state()).await);
        let second = store.entries.lock().unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(second.len(), 1);
        assert_eq!(cache.get("cus_1").await.found(), Some(active_state()));
    }

    #[tokio::test]
    async fn upsert_skips_subscriptions_without_customer() {
        let mut store = MockCacheStore::new();
        store.expect_set().never();
        let cache = SubscriptionCache::new(Arc::new(store));

        let subscription = StripeSubscription {
            id: Some("sub_1".to_string()),
            customer: None,
            status: SubscriptionStatus::Active,
            current_period_end: Some(1_793_318_400),
            trial_end: None,
            items: Default::default(),
        };

        assert!(cache.upsert_from_stripe(&subscription).await.is_none());
    }
}
