//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the backend registry and dispatcher
//! - Bind the listener last (traffic only when ready)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and nothing is served

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::validation::describe;
use crate::config::{validate_config, ProxyConfig, ValidationError};
use crate::http::{Dispatcher, HttpServer};
use crate::load_balancer::RegistryError;

/// Anything that prevents the load balancer from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", describe(.0))]
    Config(Vec<ValidationError>),

    #[error("invalid backend list: {0}")]
    Registry(#[from] RegistryError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// A server ready to run, with its bound listener.
pub struct Started {
    pub server: HttpServer,
    pub listener: TcpListener,
    pub local_addr: SocketAddr,
}

/// Validate `config`, build the dispatcher and bind the listener.
pub async fn start(config: &ProxyConfig) -> Result<Started, StartupError> {
    validate_config(config).map_err(StartupError::Config)?;

    let dispatcher = Dispatcher::from_config(config)?;
    for (index, backend) in dispatcher.registry().iter().enumerate() {
        tracing::info!(index, backend = %backend, "Backend registered");
    }

    let bind_error = |source| StartupError::Bind {
        address: config.listener.bind_address.clone(),
        source,
    };
    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;

    Ok(Started {
        server: HttpServer::new(dispatcher),
        listener,
        local_addr,
    })
}
