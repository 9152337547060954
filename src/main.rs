//! Round-robin HTTP load balancer.
//!
//! Accepts HTTP requests on one address and forwards each to the next backend
//! in a fixed list, streaming the backend's response back to the caller.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client Request   ┌─────────┐   ┌────────────┐   ┌──────────────┐
//!  ─────────────────▶│  http   │──▶│ dispatcher │──▶│ hyper client │──▶ Backend[i]
//!                    │ server  │   │  cursor++  │   │  (pooled)    │
//!  ◀─────────────────│         │◀──│  rewrite   │◀──│              │◀──
//!   Client Response  └─────────┘   └────────────┘   └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```text
//! round-robin-proxy --listen 0.0.0.0:8000 \
//!     --backend http://localhost:8001 \
//!     --backend http://localhost:8002
//! ```

use std::path::PathBuf;

use clap::Parser;

use round_robin_proxy::config::{read_config, Overrides, ProxyConfig};
use round_robin_proxy::lifecycle::{self, signals, Shutdown};
use round_robin_proxy::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "round-robin-proxy")]
#[command(about = "Round-robin HTTP load balancer", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file).
    #[arg(short, long)]
    listen: Option<String>,

    /// Backend base URL; repeat for each backend (replaces the configured list).
    #[arg(short, long = "backend")]
    backends: Vec<String>,

    /// Log level when RUST_LOG is unset.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => read_config(path),
        None => Ok(ProxyConfig::default()),
    };

    let level = cli
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|c| c.observability.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    logging::init(&level);

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    // Validation happens in lifecycle::start, after the overrides.
    Overrides {
        listen: cli.listen,
        backends: cli.backends,
        log_level: cli.log_level,
    }
    .apply(&mut config);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        "Configuration loaded"
    );

    let started = match lifecycle::start(&config).await {
        Ok(started) => started,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    tracing::info!(address = %started.local_addr, "Load balancer listening");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let mut server = tokio::spawn(started.server.run(started.listener, server_shutdown));

    tokio::select! {
        result = &mut server => result??,
        _ = signals::wait_for_signal() => {
            let notified = shutdown.trigger();
            tracing::info!(notified, "Draining in-flight requests");
            server.await??;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
