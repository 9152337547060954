//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the backend response (status, headers, body) to the caller
//! - Strip hop-by-hop headers from the backend response
//! - Stream the body frame by frame as it arrives
//! - Map forwarding failures to gateway status codes
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Backend error statuses (4xx/5xx) are content, not failures
//! - Backend timeouts result in 504 Gateway Timeout, anything else 502

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hyper::body::{Body as HttpBody, Bytes, Frame, Incoming, SizeHint};
use thiserror::Error;

use crate::http::dispatcher::{InFlight, RequestPhase};
use crate::http::request::strip_hop_by_hop;

/// Why a request could not be forwarded.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Connection refused, reset, or protocol failure talking to the backend.
    #[error("backend request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    /// The backend did not send a response head in time.
    #[error("backend did not respond within {0:?}")]
    Timeout(Duration),

    /// The rewritten request could not be built.
    #[error("could not build backend request: {0}")]
    InvalidTarget(#[from] axum::http::Error),
}

impl ForwardError {
    /// Status code reported to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ForwardError::Upstream(_) | ForwardError::InvalidTarget(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, status.canonical_reason().unwrap_or("Gateway Error")).into_response()
    }
}

/// Backend body relayed to the caller.
///
/// Moves the request to `Complete` at end of stream or `Failed` on a body
/// error. Dropping it early (caller gone) drops the backend body as well.
pub struct RelayBody {
    inner: Incoming,
    flight: InFlight,
}

impl RelayBody {
    pub fn new(inner: Incoming, mut flight: InFlight) -> Self {
        if inner.is_end_stream() {
            flight.finish(RequestPhase::Complete);
        }
        Self { inner, flight }
    }
}

impl HttpBody for RelayBody {
    type Data = Bytes;
    type Error = hyper::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(_))) => {
                if this.inner.is_end_stream() {
                    this.flight.finish(RequestPhase::Complete);
                }
            }
            Poll::Ready(Some(Err(e))) => {
                tracing::warn!(
                    parent: this.flight.span(),
                    error = %e,
                    "Backend body failed mid-stream"
                );
                this.flight.finish(RequestPhase::Failed);
            }
            Poll::Ready(None) => this.flight.finish(RequestPhase::Complete),
            Poll::Pending => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Convert the backend response into the response sent to the caller.
pub fn relay(response: Response<Incoming>, flight: InFlight) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(RelayBody::new(body, flight)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_504() {
        let err = ForwardError::Timeout(Duration::from_secs(1));
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.into_response().status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn bad_target_maps_to_502() {
        let err: ForwardError = axum::http::Uri::builder()
            .path_and_query("not a path")
            .build()
            .unwrap_err()
            .into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
