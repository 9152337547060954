//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend calls with an optional deadline
//! - Convert configured seconds into durations
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - No deadline unless configured
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use tokio::time::error::Elapsed;

use crate::config::TimeoutConfig;

/// Resolved timeouts for backend calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    pub connect: Option<Duration>,
    pub response: Option<Duration>,
    pub pool_idle: Duration,
}

impl From<&TimeoutConfig> for Deadlines {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            connect: config.connect_secs.map(Duration::from_secs),
            response: config.response_secs.map(Duration::from_secs),
            pool_idle: Duration::from_secs(config.pool_idle_secs),
        }
    }
}

impl Default for Deadlines {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

/// Await `fut`, failing with `Elapsed` if `limit` is set and passes first.
pub async fn with_deadline<F>(limit: Option<Duration>, fut: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await,
        None => Ok(fut.await),
    }
}
