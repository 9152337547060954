//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use round_robin_proxy::config::ProxyConfig;
use round_robin_proxy::lifecycle::{self, Shutdown};
use round_robin_proxy::Dispatcher;

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a backend that answers every request with
/// `"{name} {method} {path?query} {body}"` and echoes what it saw in headers.
pub async fn start_named_backend(name: &'static str) -> SocketAddr {
    let app = Router::new().fallback(move |request: Request<Body>| async move {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

        let echo = |h: &str| {
            parts
                .headers
                .get(h)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()
        };

        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_default();

        Response::builder()
            .header("x-backend", name)
            .header("x-seen-host", echo("host"))
            .header("x-seen-forwarded-for", echo("x-forwarded-for"))
            .header("x-seen-custom", echo("x-custom"))
            .header("x-seen-proxy-authorization", echo("proxy-authorization"))
            .body(Body::from(format!(
                "{} {} {} {}",
                name,
                parts.method,
                target,
                String::from_utf8_lossy(&body)
            )))
            .unwrap()
    });
    serve(app).await
}

/// Start a backend whose status and body come from `f`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let f = Arc::new(f);
    let app = Router::new().fallback(move || {
        let f = f.clone();
        async move {
            let (status, body) = f().await;
            (StatusCode::from_u16(status).unwrap(), body).into_response()
        }
    });
    serve(app).await
}

/// Start a backend that streams `chunks` without a content length,
/// pausing `delay` before each one.
pub async fn start_streaming_backend(chunks: Vec<&'static str>, delay: Duration) -> SocketAddr {
    let app = Router::new().fallback(move || {
        let chunks = chunks.clone();
        async move {
            let stream = futures_util::stream::iter(chunks).then(move |chunk| async move {
                tokio::time::sleep(delay).await;
                Ok::<_, Infallible>(Bytes::from_static(chunk.as_bytes()))
            });
            Body::from_stream(stream)
        }
    });
    serve(app).await
}

/// Start a backend speaking raw HTTP/1.1: after each request head it writes
/// `reply` verbatim and then holds the connection open. Each time the
/// load balancer closes a connection, a message arrives on the receiver.
pub async fn start_raw_backend(reply: &'static str) -> (SocketAddr, mpsc::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = mpsc::channel(8);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let closed_tx = closed_tx.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                if socket.write_all(reply.as_bytes()).await.is_err() {
                    return;
                }
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
                let _ = closed_tx.send(()).await;
            });
        }
    });

    (addr, closed_rx)
}

/// An address nothing is listening on.
pub async fn dead_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}

/// Load balancer config listening on an ephemeral loopback port.
pub fn proxy_config(backends: Vec<String>) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.backends = backends;
    config
}

/// A running load balancer.
pub struct Proxy {
    pub addr: SocketAddr,
    pub dispatcher: Arc<Dispatcher>,
    pub shutdown: Shutdown,
}

impl Proxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the load balancer; it is accepting connections when this returns.
pub async fn start_proxy(config: ProxyConfig) -> Proxy {
    let started = lifecycle::start(&config).await.unwrap();
    let dispatcher = started.server.dispatcher().clone();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let addr = started.local_addr;

    tokio::spawn(async move {
        let _ = started.server.run(started.listener, server_shutdown).await;
    });

    Proxy {
        addr,
        dispatcher,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// First word of a named backend's reply.
pub async fn backend_name(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap();
    body.split(' ').next().unwrap_or_default().to_string()
}
