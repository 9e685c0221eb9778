//! Client core for the postcodeapi.nu Dutch address lookup API.
//!
//! # Overview
//! `PostcodeClient::retrieve` validates a postcode and house number, checks
//! an optional cache, performs one GET against the sandbox or production
//! endpoint, and maps the response to an `AddressRecord` or an `Error`.
//!
//! # Design
//! - The client is immutable after construction and safe to share between
//!   threads; config, transport and cache are injected through the
//!   constructor.
//! - Request building and response parsing are separate public steps
//!   (`build_lookup` / `parse_lookup`), so callers can run the I/O
//!   themselves. `Transport` is the seam for the default `ureq` transport.
//! - Caches implement `CacheStore`. Entries live under the `postcode-api`
//!   namespace, never expire, and `clear_cache` only touches that namespace.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod normalize;
pub mod types;

pub use cache::{CacheStore, CacheStoreError, FileCache, MemoryCache};
pub use client::{PostcodeClient, CACHE_NAMESPACE, USER_AGENT};
pub use config::ClientConfig;
pub use error::{ApiFailure, DataField, Error, ErrorKind, Result};
pub use http::{HttpRequest, HttpResponse, Transport, TransportError, UreqTransport};
pub use normalize::{normalize_number, normalize_postcode};
pub use types::{AddressError, AddressRecord};
