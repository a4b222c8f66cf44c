use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::domain::repositories::cache_store::CacheStore;

/// Upper bound for one KV command.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Redis-over-HTTP cache (Upstash / Vercel KV REST protocol).
///
/// Every command is a JSON array posted to the base URL, e.g. `["GET", "key"]`,
/// answered with `{"result": ...}` or `{"error": "..."}`.
pub struct KvRestStore {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct KvResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl KvRestStore {
    pub fn new(base_url: String, token: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "kv client: falling back to a client without timeout");
                reqwest::Client::new()
            });

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn command(&self, command: Value, context: &str) -> Result<Option<Value>> {
        let resp = self
            .http
            .post(&self.base_url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&command)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        let parsed = serde_json::from_str::<KvResponse>(&body).ok();

        if let Some(message) = parsed.as_ref().and_then(|parsed| parsed.error.as_deref()) {
            error!(
                status = %status,
                kv_error = %message,
                context = %context,
                "kv request failed"
            );
            return Err(anyhow!("KV command failed: {} ({})", context, message));
        }

        if !status.is_success() {
            error!(
                status = %status,
                response_body = %body,
                context = %context,
                "kv request failed"
            );
            return Err(anyhow!("KV command failed: {} (status {})", context, status));
        }

        let parsed =
            parsed.ok_or_else(|| anyhow!("KV command returned a malformed body: {}", context))?;
        Ok(parsed.result.filter(|value| !value.is_null()))
    }
}

#[async_trait]
impl CacheStore for KvRestStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.command(json!(["GET", key]), "get").await
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        self.command(json!(["SET", key, encoded]), "set").await?;
        Ok(())
    }
}
