use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use serde_json::Value;

/// Raw key-value cache.
///
/// Values come back exactly as the backend hands them out: usually a JSON
/// string holding a serialized document, sometimes an already structured value.
#[automock]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: &Value) -> Result<()>;
}
