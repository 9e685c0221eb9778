//! Address lookup client for the postcodeapi.nu v3 API.
//!
//! # Design
//! `PostcodeClient` holds its immutable configuration, a transport and an
//! optional cache handle; it carries no mutable state between calls and is
//! safe to share across threads. Like the request/response types in
//! `http`, the round-trip is split into `build_lookup` (produces an
//! `HttpRequest`) and `parse_lookup` (consumes an `HttpResponse`), so a
//! caller can also execute the I/O itself. `retrieve` glues the two together
//! with normalization and the cache.
//!
//! The cache check-then-populate sequence is not atomic. Two concurrent
//! misses for the same key both hit the API and both write the same record.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheStore, NAMESPACE_SEPARATOR};
use crate::config::ClientConfig;
use crate::error::{ApiFailure, Error, Result};
use crate::http::{HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::normalize::{normalize_number, normalize_postcode};
use crate::types::{AddressMapping, AddressRecord};

/// Namespace of every cache entry written by the client.
pub const CACHE_NAMESPACE: &str = "postcode-api";

pub const USER_AGENT: &str = concat!(
    "postcode-core/",
    env!("CARGO_PKG_VERSION"),
    " (postcodeapi.nu client; ureq)"
);

/// Client for the postcode lookup API.
#[derive(Clone)]
pub struct PostcodeClient {
    base_url: String,
    api_key: String,
    transport: Arc<dyn Transport>,
    /// `None` when caching is disabled.
    cache: Option<Arc<dyn CacheStore>>,
}

impl PostcodeClient {
    /// Builds a client that talks HTTP through `ureq`.
    pub fn new(config: &ClientConfig, cache: Arc<dyn CacheStore>) -> Self {
        let transport = Arc::new(UreqTransport::new(config.timeout()));
        Self::with_transport(config, cache, transport)
    }

    pub fn with_transport(
        config: &ClientConfig,
        cache: Arc<dyn CacheStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        if !config.use_sandbox && !config.uses_production() {
            warn!("production endpoint requested without an API key, using the sandbox");
        }
        Self {
            base_url: config.base_url().to_string(),
            api_key: config.api_key_header().to_string(),
            transport,
            cache: config.use_cache.then_some(cache),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Looks up the address for a user-supplied postcode and house number.
    ///
    /// Inputs are validated before any cache or network access. Successful
    /// lookups are memoized forever when caching is enabled.
    pub fn retrieve(&self, postcode: &str, number: &str) -> Result<AddressRecord> {
        let postcode = normalize_postcode(postcode)?;
        let number = normalize_number(number)?;
        let key = cache_key(&postcode, &number);

        if let Some(address) = self.cached(&key)? {
            debug!(%postcode, %number, "address served from cache");
            return Ok(address);
        }

        let request = self.build_lookup(&postcode, &number);
        debug!(url = %request.url, "looking up address");
        let response = self
            .transport
            .execute(&request)
            .map_err(|e| Error::Transport {
                request: Box::new(request.clone()),
                message: e.to_string(),
            })?;
        let address = self.parse_lookup(request, response)?;

        self.store(&key, &address)?;
        Ok(address)
    }

    /// Removes every lookup this client has cached.
    ///
    /// Fails with `Error::CacheClear` when caching is disabled or the store
    /// cannot be flushed.
    pub fn clear_cache(&self) -> Result<()> {
        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| Error::CacheClear("caching is disabled".to_string()))?;
        cache
            .flush_namespace(CACHE_NAMESPACE)
            .map_err(|e| Error::CacheClear(e.to_string()))?;
        debug!("postcode cache cleared");
        Ok(())
    }

    /// Builds the lookup request for an already-normalized postcode and number.
    pub fn build_lookup(&self, postcode: &str, number: &str) -> HttpRequest {
        HttpRequest {
            url: format!("{}/v3/lookup/{postcode}/{number}", self.base_url),
            headers: vec![
                ("X-API-Key".to_string(), self.api_key.clone()),
                ("User-Agent".to_string(), USER_AGENT.to_string()),
            ],
        }
    }

    /// Maps a lookup response to an address or an API error.
    pub fn parse_lookup(&self, request: HttpRequest, response: HttpResponse) -> Result<AddressRecord> {
        if response.status != 200 {
            return Err(classify_status(request, &response));
        }

        let raw: AddressMapping = serde_json::from_str(&response.body).map_err(|e| {
            malformed_response("Failed to convert response to data", &request, &response, e)
        })?;
        AddressRecord::try_from(raw).map_err(|e| {
            malformed_response("Failed to create address record", &request, &response, e)
        })
    }

    /// A store failure is an error; an entry that no longer decodes is a miss.
    fn cached(&self, key: &str) -> Result<Option<AddressRecord>> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        let Some(value) = cache.get(key).map_err(|e| Error::Cache(e.to_string()))? else {
            return Ok(None);
        };
        match serde_json::from_str(&value) {
            Ok(address) => Ok(Some(address)),
            Err(e) => {
                warn!(key, error = %e, "discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    fn store(&self, key: &str, address: &AddressRecord) -> Result<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };
        let value = serde_json::to_string(address).map_err(|e| Error::Cache(e.to_string()))?;
        cache
            .forever(key, &value)
            .map_err(|e| Error::Cache(e.to_string()))
    }
}

impl std::fmt::Debug for PostcodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostcodeClient")
            .field("base_url", &self.base_url)
            .field("cache_enabled", &self.cache_enabled())
            .finish_non_exhaustive()
    }
}

fn cache_key(postcode: &str, number: &str) -> String {
    format!("{CACHE_NAMESPACE}{NAMESPACE_SEPARATOR}postcode.{postcode}.{number}")
}

/// Map a non-200 status to the matching error variant. First match wins.
fn classify_status(request: HttpRequest, response: &HttpResponse) -> Error {
    let failure = |message: String| {
        Box::new(ApiFailure {
            status: response.status,
            reason: response.reason.clone(),
            message,
            request,
            cause: None,
        })
    };

    let reason = if response.reason.is_empty() {
        response.status.to_string()
    } else {
        response.reason.clone()
    };

    match response.status {
        401 => Error::AuthenticationFailure(failure(
            "The provided API key does not seem to work".to_string(),
        )),
        404 => Error::NotFound(failure(
            "The postcode/number combination was not found".to_string(),
        )),
        status if status < 400 => Error::Api(failure(format!(
            "Server gave unexpected response code: {reason}"
        ))),
        _ => Error::Api(failure(format!("Request failed: {reason}"))),
    }
}

fn malformed_response(
    message: &str,
    request: &HttpRequest,
    response: &HttpResponse,
    cause: impl std::fmt::Display,
) -> Error {
    Error::Api(Box::new(ApiFailure {
        status: response.status,
        reason: response.reason.clone(),
        message: message.to_string(),
        request: request.clone(),
        cause: Some(cause.to_string()),
    }))
}
