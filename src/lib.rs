//! Round-robin HTTP load balancer library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;

pub use config::ProxyConfig;
pub use http::{Dispatcher, HttpServer};
pub use lifecycle::Shutdown;
pub use load_balancer::{BackendEndpoint, BackendRegistry};
