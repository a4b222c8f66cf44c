use anyhow::{Result, bail};
use paygate::payments::stripe_client::DEFAULT_API_BASE;

use super::config_model::{BackendServer, DotEnvyConfig, KvRest, Site, Stripe};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    load_from(|key| std::env::var(key).ok())
}

/// Builds the config from any variable source; `load` feeds it the process environment.
pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<DotEnvyConfig> {
    let env_string = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let backend_server = BackendServer {
        port: env_string("SERVER_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()?,
        body_limit: env_string("SERVER_BODY_LIMIT")
            .unwrap_or_else(|| "1".to_string())
            .parse()?,
        timeout: env_string("SERVER_TIMEOUT")
            .unwrap_or_else(|| "30".to_string())
            .parse()?,
    };

    let stripe = Stripe {
        secret_key: env_string("STRIPE_SECRET_KEY"),
        webhook_secret: env_string("STRIPE_WEBHOOK_SECRET"),
        api_base: env_string("STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
    };

    let site = Site {
        base_url: env_string("SITE_URL")
            .or_else(|| env_string("NEXT_PUBLIC_SITE_URL"))
            .map(|url| url.trim_end_matches('/').to_string()),
    };

    let kv = match (env_string("KV_REST_API_URL"), env_string("KV_REST_API_TOKEN")) {
        (Some(url), Some(token)) => Some(KvRest { url, token }),
        (None, None) => None,
        _ => bail!("KV_REST_API_URL and KV_REST_API_TOKEN must be set together"),
    };

    Ok(DotEnvyConfig {
        backend_server,
        stripe,
        site,
        kv,
    })
}
