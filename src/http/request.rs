//! Request handling and transformation.
//!
//! # Responsibilities
//! - Rewrite the request target to point at the selected backend
//! - Strip hop-by-hop headers
//! - Record the caller in X-Forwarded-For
//! - Prepare request for forwarding to backend
//!
//! # Design Decisions
//! - Path is `backend prefix + inbound path`, concatenated literally
//! - Method, query, remaining headers and body pass through untouched
//! - The body is streamed, never buffered

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Body,
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue},
        Request, Uri, Version,
    },
};

use crate::config::ForwardingConfig;
use crate::http::response::ForwardError;
use crate::load_balancer::BackendEndpoint;

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Build the outbound URI: backend scheme and authority, `prefix + path`,
/// inbound query string preserved.
pub fn rewrite_uri(backend: &BackendEndpoint, inbound: &Uri) -> Result<Uri, axum::http::Error> {
    let mut path_and_query = String::with_capacity(
        backend.path_prefix().len() + inbound.path_and_query().map_or(1, |pq| pq.as_str().len()),
    );
    path_and_query.push_str(backend.path_prefix());
    path_and_query.push_str(inbound.path());
    if let Some(query) = inbound.query() {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }

    Uri::builder()
        .scheme(backend.scheme_part().clone())
        .authority(backend.authority_part().clone())
        .path_and_query(path_and_query)
        .build()
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Append `client` to X-Forwarded-For, keeping earlier hops.
pub fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let prior: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    let value = if prior.is_empty() {
        client.to_string()
    } else {
        format!("{}, {}", prior.join(", "), client)
    };

    match HeaderValue::from_str(&value) {
        Ok(v) => {
            headers.insert(X_FORWARDED_FOR, v);
        }
        Err(_) => {
            // An IP address always forms a valid header value.
            if let Ok(v) = HeaderValue::from_str(&client.to_string()) {
                headers.insert(X_FORWARDED_FOR, v);
            }
        }
    }
}

/// Turn an inbound request into the request sent to `backend`.
pub fn prepare_outbound(
    request: Request<Body>,
    backend: &BackendEndpoint,
    settings: &ForwardingConfig,
    client_addr: Option<SocketAddr>,
) -> Result<Request<Body>, ForwardError> {
    let (mut parts, body) = request.into_parts();

    parts.uri = rewrite_uri(backend, &parts.uri)?;
    // Backends are spoken to over HTTP/1.1 whatever the caller used.
    parts.version = Version::HTTP_11;

    strip_hop_by_hop(&mut parts.headers);

    if !settings.preserve_host {
        // The client fills Host from the URI authority when absent.
        parts.headers.remove(header::HOST);
    }

    if settings.x_forwarded_for {
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut parts.headers, addr.ip());
        }
    }

    Ok(Request::from_parts(parts, body))
}
