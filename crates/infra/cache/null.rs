use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::domain::repositories::cache_store::CacheStore;

/// Stand-in used when no cache service is configured: reads miss, writes vanish.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCacheStore;

#[async_trait]
impl CacheStore for NullCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &Value) -> Result<()> {
        Ok(())
    }
}
