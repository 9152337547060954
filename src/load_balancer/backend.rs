//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server by its base URL
//! - Parse and validate the URL once, at startup
//! - Hold the pieces a request rewrite needs (scheme, authority, path prefix)

use std::fmt;
use std::str::FromStr;

use axum::http::uri::{Authority, Scheme};
use thiserror::Error;
use url::Url;

/// Errors raised while parsing a backend base URL.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The string is not an absolute URL.
    #[error("invalid backend URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The URL has no host component.
    #[error("backend URL {0:?} has no host")]
    MissingHost(String),

    /// Only plain HTTP backends can be reached.
    #[error("backend URL {url:?} uses unsupported scheme {scheme:?}")]
    UnsupportedScheme { url: String, scheme: String },
}

/// A single backend server.
///
/// Immutable once constructed: the scheme and authority have already been
/// validated, so building an outbound URI from them cannot fail on shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoint {
    scheme: Scheme,
    authority: Authority,
    path_prefix: String,
}

impl BackendEndpoint {
    /// Parse a backend base URL such as `http://localhost:8001/api`.
    pub fn parse(input: &str) -> Result<Self, BackendError> {
        let url = Url::parse(input).map_err(|e| BackendError::InvalidUrl {
            url: input.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" {
            return Err(BackendError::UnsupportedScheme {
                url: input.to_string(),
                scheme: url.scheme().to_string(),
            });
        }

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h,
            _ => return Err(BackendError::MissingHost(input.to_string())),
        };

        // `port()` is None when the port is the scheme default.
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let authority = Authority::from_str(&host).map_err(|e| BackendError::InvalidUrl {
            url: input.to_string(),
            reason: e.to_string(),
        })?;

        // `http://h` and `http://h/` both normalise to "/"; treat that as no prefix.
        let path_prefix = match url.path() {
            "/" => String::new(),
            path => path.to_string(),
        };

        Ok(Self {
            scheme: Scheme::HTTP,
            authority,
            path_prefix,
        })
    }

    /// URL scheme, e.g. "http".
    pub fn scheme(&self) -> &str {
        self.scheme.as_str()
    }

    /// `host[:port]` of the backend.
    pub fn host(&self) -> &str {
        self.authority.as_str()
    }

    /// Path prepended to every forwarded request path. May be empty.
    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    pub(crate) fn scheme_part(&self) -> &Scheme {
        &self.scheme
    }

    pub(crate) fn authority_part(&self) -> &Authority {
        &self.authority
    }
}

impl FromStr for BackendEndpoint {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BackendEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority, self.path_prefix)
    }
}
