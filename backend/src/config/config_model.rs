#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub stripe: Stripe,
    pub site: Site,
    pub kv: Option<KvRest>,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// Request body limit in MiB.
    pub body_limit: u64,
    /// Request timeout in seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    /// Absent keys keep the service up; the Stripe-backed routes answer with a
    /// misconfiguration error instead.
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct Site {
    /// Public base URL used for checkout redirects. Reconstructed from request headers when unset.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct KvRest {
    pub url: String,
    pub token: String,
}
