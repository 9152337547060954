//! Fixed, ordered set of backends built once at startup.

use thiserror::Error;

use crate::load_balancer::backend::{BackendEndpoint, BackendError};

/// Errors raised while building the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no backends configured")]
    Empty,

    #[error("backend #{index}: {source}")]
    Backend {
        index: usize,
        #[source]
        source: BackendError,
    },
}

/// Ordered, immutable list of backends. Never empty.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    backends: Vec<BackendEndpoint>,
}

impl BackendRegistry {
    /// Parse every URL; the first malformed one aborts construction.
    pub fn from_urls<I, S>(urls: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let backends = urls
            .into_iter()
            .enumerate()
            .map(|(index, url)| {
                BackendEndpoint::parse(url.as_ref())
                    .map_err(|source| RegistryError::Backend { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(backends)
    }

    /// Build from already-parsed endpoints.
    pub fn new(backends: Vec<BackendEndpoint>) -> Result<Self, RegistryError> {
        if backends.is_empty() {
            return Err(RegistryError::Empty);
        }
        Ok(Self { backends })
    }

    /// Number of backends (always >= 1).
    pub fn count(&self) -> usize {
        self.backends.len()
    }

    /// Backend at `index`. Panics if `index >= count()`.
    pub fn at(&self, index: usize) -> &BackendEndpoint {
        &self.backends[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendEndpoint> {
        self.backends.iter()
    }
}
