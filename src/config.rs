//! Config module contains the top-level config for the app.

use config_crate::{Config as RawConfig, ConfigError, Environment, File};
use std::env;

use enum_iterator::IntoEnumIterator;

use http::client::Config as HttpClientConfig;
use models::DocumentType;
use rate_limit::RatePolicy;

/// Basic settings - HTTP binding, databases, psp endpoints, policies
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: Server,
    pub client: Client,
    pub redis: Option<Redis>,
    pub psp: Psp,
    pub onboarding: Onboarding,
    pub rate_limits: RateLimits,
    pub keys: Keys,
    pub sentry: Option<Sentry>,
}

/// Common server settings
#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub host: String,
    pub port: String,
    pub database: String,
    pub thread_count: usize,
}

/// Http client settings
#[derive(Debug, Deserialize, Clone)]
pub struct Client {
    pub http_client_retries: usize,
    pub http_client_buffer_size: usize,
    pub timeout_duration_ms: u64,
}

/// Shared rate limiter store; without it limiting degrades to
/// per-process buckets
#[derive(Debug, Deserialize, Clone)]
pub struct Redis {
    pub url: String,
}

/// Payment provider introspection endpoints
#[derive(Debug, Deserialize, Clone)]
pub struct Psp {
    pub stripe_url: String,
    pub paypal_url: String,
}

/// Onboarding workflow policy
#[derive(Debug, Deserialize, Clone)]
pub struct Onboarding {
    #[serde(default = "all_document_types")]
    pub required_documents: Vec<DocumentType>,
    #[serde(default = "default_true")]
    pub allow_rejected_reset: bool,
}

fn all_document_types() -> Vec<DocumentType> {
    DocumentType::into_enum_iter().collect()
}

fn default_true() -> bool {
    true
}

/// Token bucket policies per tenant tier
#[derive(Debug, Deserialize, Clone)]
pub struct RateLimits {
    pub merchant: RatePolicy,
    pub agent: RatePolicy,
}

impl RateLimits {
    pub fn policy_for(&self, kind: ::models::TenantKind) -> RatePolicy {
        match kind {
            ::models::TenantKind::Merchant => self.merchant,
            ::models::TenantKind::Agent => self.agent,
        }
    }
}

/// Api key issuing and authentication settings
#[derive(Debug, Deserialize, Clone)]
pub struct Keys {
    pub display_prefix_len: usize,
    /// Base64 der public key accepted on the deprecated legacy token
    /// path; absent means the fallback is disabled
    pub legacy_token_public_key_base64: Option<String>,
    /// Public key for verifying agent identity assertions
    pub agent_identity_public_key_base64: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Sentry {
    pub dsn: String,
}

/// Creates new app config struct
/// #Examples
/// ```
/// use authorization_lib::config::*;
///
/// let config = Config::new();
/// ```
impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        let mut s = RawConfig::new();
        s.merge(File::with_name("config/base"))?;

        // Note that this file is _optional_
        let env = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        s.merge(File::with_name(&format!("config/{}", env)).required(false))?;

        // Add in settings from the environment (with a prefix of AUTHZ)
        s.merge(Environment::with_prefix("AUTHZ"))?;

        s.try_into()
    }

    pub fn to_http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            http_client_retries: self.client.http_client_retries,
            http_client_buffer_size: self.client.http_client_buffer_size,
            timeout_duration_ms: self.client.timeout_duration_ms,
        }
    }
}
