//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! `HttpRequest` and `HttpResponse` describe a lookup round-trip as plain
//! data. `PostcodeClient::build_lookup` produces a request and
//! `PostcodeClient::parse_lookup` consumes a response without touching the
//! network. The `Transport` trait is the seam where the actual I/O happens;
//! `UreqTransport` is the default implementation, and tests substitute their
//! own.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// A GET request described as plain data.
///
/// Lookups never carry a body or query string, so only the absolute URL and
/// headers are recorded. Kept on every API error for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Returns the value of the first header matching `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Reason phrase for `status`, e.g. `Not Found`.
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// The request could not be completed at the transport level (connect
/// failure, timeout, unreadable body).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Executes a lookup request against the network.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a shared `ureq` agent.
///
/// The agent is configured with `http_status_as_error(false)` so 4xx/5xx
/// responses are returned as data, letting the client classify them.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(url = %request.url, "sending lookup request");

        let mut builder = self.agent.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder
            .call()
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: reason_phrase(status),
            headers,
            body,
        })
    }
}

/// Canonical reason for `status`, or the bare code when it has none.
fn reason_phrase(status: ureq::http::StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            url: "http://localhost/v3/lookup/6545CA/29".to_string(),
            headers: vec![("X-API-Key".to_string(), "secret".to_string())],
        };
        assert_eq!(req.header("x-api-key"), Some("secret"));
        assert_eq!(req.header("user-agent"), None);
    }

    #[test]
    fn unregistered_status_uses_numeric_reason() {
        let status = |code| ureq::http::StatusCode::from_u16(code).unwrap();
        assert_eq!(reason_phrase(status(502)), "Bad Gateway");
        assert_eq!(reason_phrase(status(599)), "599");
    }
}
