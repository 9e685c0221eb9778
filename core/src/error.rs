//! Error types for the postcode client.
//!
//! # Design
//! `AuthenticationFailure` and `NotFound` are specializations of a generic
//! API failure, so all three share the `ApiFailure` payload (status, reason
//! phrase, message, originating request) and `Error::is_api` groups them.
//! `MalformedData` is raised before any I/O and carries no request.

use std::fmt;

use thiserror::Error;

use crate::http::HttpRequest;

/// Which user-supplied input failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataField {
    Postcode,
    Number,
}

impl fmt::Display for DataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataField::Postcode => write!(f, "Postcode"),
            DataField::Number => write!(f, "Number"),
        }
    }
}

/// Discriminant of `Error`, handy for matching without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedData,
    Api,
    AuthenticationFailure,
    NotFound,
    CacheClear,
    Cache,
    Transport,
}

/// Diagnostics attached to every API-kind error.
#[derive(Debug, Clone)]
pub struct ApiFailure {
    pub status: u16,
    pub reason: String,
    pub message: String,
    pub request: HttpRequest,
    /// Underlying decode/validation error for malformed responses.
    pub cause: Option<String>,
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (HTTP {})", self.message, self.status)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

/// Errors returned by `PostcodeClient`.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller input does not have the required shape.
    #[error("{field} is invalid")]
    MalformedData { field: DataField },

    /// Unexpected status or an unusable 200 body.
    #[error("{0}")]
    Api(Box<ApiFailure>),

    /// The API rejected the key (401).
    #[error("{0}")]
    AuthenticationFailure(Box<ApiFailure>),

    /// No address for the postcode/number combination (404).
    #[error("{0}")]
    NotFound(Box<ApiFailure>),

    #[error("failed to clear cache: {0}")]
    CacheClear(String),

    /// The cache store failed to read or write an entry during a lookup.
    #[error("cache store failed: {0}")]
    Cache(String),

    /// The request never produced a response (connect failure, timeout).
    #[error("request to {} failed: {message}", .request.url)]
    Transport {
        request: Box<HttpRequest>,
        message: String,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedData { .. } => ErrorKind::MalformedData,
            Error::Api(_) => ErrorKind::Api,
            Error::AuthenticationFailure(_) => ErrorKind::AuthenticationFailure,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::CacheClear(_) => ErrorKind::CacheClear,
            Error::Cache(_) => ErrorKind::Cache,
            Error::Transport { .. } => ErrorKind::Transport,
        }
    }

    /// True for `Api` and its two specializations.
    pub fn is_api(&self) -> bool {
        self.api_failure().is_some()
    }

    pub fn api_failure(&self) -> Option<&ApiFailure> {
        match self {
            Error::Api(failure) | Error::AuthenticationFailure(failure) | Error::NotFound(failure) => {
                Some(failure.as_ref())
            }
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.api_failure().map(|failure| failure.status)
    }

    pub fn request(&self) -> Option<&HttpRequest> {
        match self {
            Error::Transport { request, .. } => Some(request.as_ref()),
            _ => self.api_failure().map(|failure| &failure.request),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
