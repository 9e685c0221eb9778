//! Client configuration.
//!
//! Loaded once when the client is built. Values come from the environment
//! (`from_env`) or from any serde source using the kebab-case option names
//! `use-sandbox`, `api-key`, `use-cache`, `timeout-secs`, `sandbox-url` and
//! `production-url`.

use std::env;
use std::time::Duration;

use serde::Deserialize;

pub const SANDBOX_URL: &str = "https://sandbox.postcodeapi.nu";
pub const PRODUCTION_URL: &str = "https://api.postcodeapi.nu";

/// Sent as `X-API-Key` when no key is configured.
pub const FALLBACK_API_KEY: &str = "test";

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    /// Production is only used when this is false *and* a key is present.
    pub use_sandbox: bool,
    pub use_cache: bool,
    pub timeout_secs: u64,
    pub sandbox_url: String,
    pub production_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            use_sandbox: true,
            use_cache: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            sandbox_url: SANDBOX_URL.to_string(),
            production_url: PRODUCTION_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Creates a ClientConfig from process environment variables.
    ///
    /// # Environment Variables
    /// - `POSTCODE_API_SANDBOX` - Use the sandbox endpoint (default: true)
    /// - `POSTCODE_API_KEY` - API key (default: none)
    /// - `POSTCODE_API_USE_CACHE` - Memoize lookups (default: true)
    /// - `POSTCODE_API_TIMEOUT` - Request timeout in seconds (default: 5)
    pub fn from_env() -> Self {
        Self::from_env_with(|name| env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_key: lookup("POSTCODE_API_KEY"),
            use_sandbox: lookup("POSTCODE_API_SANDBOX")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.use_sandbox),
            use_cache: lookup("POSTCODE_API_USE_CACHE")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.use_cache),
            timeout_secs: lookup("POSTCODE_API_TIMEOUT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.timeout_secs),
            ..defaults
        }
    }

    /// The configured key, treating an empty or blank key as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// True only when production was requested and a key is available.
    /// Without a key the sandbox is always used, so unauthenticated traffic
    /// never reaches production.
    pub fn uses_production(&self) -> bool {
        !self.use_sandbox && self.api_key().is_some()
    }

    pub fn base_url(&self) -> &str {
        let url = if self.uses_production() {
            &self.production_url
        } else {
            &self.sandbox_url
        };
        url.trim_end_matches('/')
    }

    pub fn api_key_header(&self) -> &str {
        self.api_key().unwrap_or(FALLBACK_API_KEY)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
