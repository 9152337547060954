//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backend base URLs, in rotation order.
    pub backends: Vec<String>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request forwarding behaviour.
    pub forwarding: ForwardingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            backends: vec![
                "http://localhost:8001".to_string(),
                "http://localhost:8002".to_string(),
                "http://localhost:8003".to_string(),
            ],
            timeouts: TimeoutConfig::default(),
            forwarding: ForwardingConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address as a literal `ip:port` (e.g., "0.0.0.0:8000" or
    /// "[::1]:8000"). Host names such as `localhost:8000` are rejected
    /// rather than resolved.
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Timeouts for backend calls. Unset means no deadline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: Option<u64>,

    /// Time allowed for the backend to send its response head, in seconds.
    pub response_secs: Option<u64>,

    /// Idle pooled connections are closed after this many seconds.
    pub pool_idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: None,
            response_secs: None,
            pool_idle_secs: 90,
        }
    }
}

/// How inbound requests are adjusted before forwarding.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Send the caller's Host header unchanged (otherwise the backend authority).
    pub preserve_host: bool,

    /// Append the caller IP to X-Forwarded-For.
    pub x_forwarded_for: bool,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            preserve_host: true,
            x_forwarded_for: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
