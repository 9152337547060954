//! Backend selection and request forwarding.
//!
//! # Per-request states
//! ```text
//! Received → BackendSelected → Forwarding → ResponseStreaming → Complete
//!                  └──────────────┴───────────────┴──────────────→ Failed
//! ```
//! There is no retry transition: a failure is terminal for that request.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};
use tracing::{field, Instrument, Span};
use uuid::Uuid;

use crate::config::{ForwardingConfig, ProxyConfig};
use crate::http::request::prepare_outbound;
use crate::http::response::{relay, ForwardError};
use crate::load_balancer::{BackendEndpoint, BackendRegistry, RegistryError, RotationCursor};
use crate::resilience::{with_deadline, Deadlines};

/// Where a request is in its forwarding lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Received,
    BackendSelected,
    Forwarding,
    ResponseStreaming,
    Complete,
    Failed,
}

impl RequestPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestPhase::Complete | RequestPhase::Failed)
    }
}

/// Tracks one request's phase; logs a cancellation if dropped mid-flight.
#[derive(Debug)]
pub struct InFlight {
    phase: RequestPhase,
    span: Span,
}

impl InFlight {
    pub fn new(span: Span) -> Self {
        Self {
            phase: RequestPhase::Received,
            span,
        }
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Move to a non-terminal phase.
    pub fn enter(&mut self, phase: RequestPhase) {
        tracing::trace!(parent: &self.span, from = ?self.phase, to = ?phase, "Request phase");
        self.phase = phase;
    }

    /// Move to a terminal phase. Later calls are ignored.
    pub fn finish(&mut self, phase: RequestPhase) {
        if self.phase.is_terminal() {
            return;
        }
        self.enter(phase);
        if phase == RequestPhase::Complete {
            tracing::debug!(parent: &self.span, "Request complete");
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.phase.is_terminal() {
            tracing::debug!(parent: &self.span, phase = ?self.phase, "Request cancelled by caller");
        }
    }
}

/// Per-request rewrite descriptor, fixed at selection time.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub index: usize,
    pub backend: &'a BackendEndpoint,
}

/// Selects the next backend and forwards requests to it.
///
/// One instance is shared by every connection. The rotation cursor is the
/// only mutable state and is never held across backend I/O.
#[derive(Debug)]
pub struct Dispatcher {
    registry: BackendRegistry,
    cursor: RotationCursor,
    client: Client<HttpConnector, Body>,
    forwarding: ForwardingConfig,
    deadlines: Deadlines,
}

impl Dispatcher {
    /// Create a dispatcher over `registry` with its own pooled HTTP client.
    pub fn new(
        registry: BackendRegistry,
        forwarding: ForwardingConfig,
        deadlines: Deadlines,
    ) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(deadlines.connect);
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(deadlines.pool_idle)
            .pool_timer(TokioTimer::new())
            .build(connector);

        let cursor = RotationCursor::new(registry.count());

        Self {
            registry,
            cursor,
            client,
            forwarding,
            deadlines,
        }
    }

    /// Build a dispatcher from a full configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, RegistryError> {
        let registry = BackendRegistry::from_urls(&config.backends)?;
        Ok(Self::new(
            registry,
            config.forwarding.clone(),
            Deadlines::from(&config.timeouts),
        ))
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Index of the most recently selected backend.
    pub fn cursor(&self) -> usize {
        self.cursor.current()
    }

    /// Advance the rotation and return the chosen backend.
    pub fn select(&self) -> Selection<'_> {
        let index = self.cursor.advance();
        Selection {
            index,
            backend: self.registry.at(index),
        }
    }

    /// Forward one inbound request and return the response for the caller.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let span = tracing::info_span!(
            "forward",
            request_id = %request_id,
            method = %request.method(),
            path = %request.uri().path(),
            backend = field::Empty,
        );

        self.forward(request).instrument(span).await
    }

    async fn forward(&self, request: Request<Body>) -> Response {
        let mut flight = InFlight::new(Span::current());

        let client_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let selection = self.select();
        Span::current().record("backend", field::display(selection.backend));
        flight.enter(RequestPhase::BackendSelected);

        tracing::debug!(index = selection.index, "Backend selected");

        let prepared =
            prepare_outbound(request, selection.backend, &self.forwarding, client_addr);
        let outbound = match prepared {
            Ok(req) => req,
            Err(e) => return fail(flight, e),
        };

        flight.enter(RequestPhase::Forwarding);

        let sent = with_deadline(self.deadlines.response, self.client.request(outbound)).await;
        let response = match sent {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return fail(flight, ForwardError::Upstream(e)),
            Err(_) => {
                let limit = self.deadlines.response.unwrap_or_default();
                return fail(flight, ForwardError::Timeout(limit));
            }
        };

        tracing::debug!(status = %response.status(), "Backend responded");

        flight.enter(RequestPhase::ResponseStreaming);
        relay(response, flight)
    }
}

fn fail(mut flight: InFlight, error: ForwardError) -> Response {
    tracing::warn!(error = %error, status = %error.status(), "Forwarding failed");
    flight.finish(RequestPhase::Failed);
    error.into_response()
}
