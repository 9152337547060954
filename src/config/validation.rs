//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every backend URL must parse; the list must not be empty
//! - Validate value ranges (timeouts > 0, bind address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::load_balancer::BackendEndpoint;

/// A single semantic problem with a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("at least one backend is required")]
    NoBackends,

    #[error("backend #{index} ({url}): {reason}")]
    InvalidBackend {
        index: usize,
        url: String,
        reason: String,
    },

    #[error("invalid bind address {0:?}: expected a literal ip:port")]
    InvalidBindAddress(String),

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
}

/// Render a list of problems as one comma-separated line.
pub(crate) fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    for (index, url) in config.backends.iter().enumerate() {
        if let Err(e) = BackendEndpoint::parse(url) {
            errors.push(ValidationError::InvalidBackend {
                index,
                url: url.clone(),
                reason: e.to_string(),
            });
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.timeouts.connect_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout { field: "timeouts.connect_secs" });
    }
    if config.timeouts.response_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout { field: "timeouts.response_secs" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_problem() {
        let mut config = ProxyConfig::default();
        config.backends = vec!["http://ok:80".into(), "not a url".into()];
        config.listener.bind_address = "nowhere".into();
        config.timeouts.response_secs = Some(0);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], ValidationError::InvalidBackend { index: 1, .. }));
        assert_eq!(errors[1], ValidationError::InvalidBindAddress("nowhere".into()));
        assert_eq!(
            errors[2],
            ValidationError::ZeroTimeout { field: "timeouts.response_secs" }
        );
    }

    #[test]
    fn bind_address_must_be_an_ip_literal() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "localhost:8000".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::InvalidBindAddress("localhost:8000".into())]);
        assert!(errors[0].to_string().contains("literal ip:port"));

        config.listener.bind_address = "[::1]:8000".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_backend_list_is_fatal() {
        let mut config = ProxyConfig::default();
        config.backends.clear();
        assert_eq!(validate_config(&config).unwrap_err(), vec![ValidationError::NoBackends]);
    }
}
