//! Shutdown coordination for the load balancer.
//!
//! The server stops accepting once notified; requests already being
//! forwarded run to completion before `HttpServer::run` returns.

use tokio::sync::broadcast;

/// Fan-out stop signal shared by the server and test harnesses.
#[derive(Debug)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Notify every subscriber and return how many were listening.
    ///
    /// Zero means the server already stopped on its own.
    pub fn trigger(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
