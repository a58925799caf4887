//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

use request_context::config::AppConfig;
use request_context::http::{HttpServer, RequestContextLayer, RouterContextExt};
use request_context::lifecycle::Shutdown;
use request_context::{get_context, get_full_context, set_context};

/// Response pieces collected from an in-process call.
pub struct Collected {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Collected {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.to_str().unwrap())
    }
}

/// Routes used across the middleware tests.
pub fn test_routes() -> Router {
    Router::new()
        .route(
            "/ids",
            get(|| async {
                Json(json!({
                    "request_id": get_context("request_id"),
                    "correlation_id": get_context("correlation_id"),
                }))
            }),
        )
        .route(
            "/set",
            get(|| async {
                set_context("user_id", 123);
                set_context("org_id", "org-456");
                Json(Value::Object(get_full_context()))
            }),
        )
        .route(
            "/stream",
            get(|| async {
                let chunks = futures_util::stream::iter(0..2).map(|_| {
                    let id = get_context("request_id").unwrap_or(Value::Null);
                    Ok::<_, io::Error>(Bytes::from(format!("{id}\n")))
                });
                Body::from_stream(chunks)
            }),
        )
}

/// `test_routes` behind the context middleware.
pub fn app(layer: RequestContextLayer) -> Router {
    test_routes().with_request_context(layer)
}

/// Sends `request` through `router` in-process and buffers the body.
pub async fn send(router: Router, request: Request<Body>) -> Collected {
    let response = router.oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    Collected {
        status: parts.status,
        headers: parts.headers,
        body,
    }
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

/// Generator returning `prefix-1`, `prefix-2`, ...
pub fn sequence(prefix: &'static str) -> impl Fn() -> String + Send + Sync + 'static {
    let counter = AtomicUsize::new(0);
    move || format!("{prefix}-{}", counter.fetch_add(1, Ordering::SeqCst) + 1)
}

/// In-memory log sink for `tracing_subscriber::fmt` layers.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()
    }

    pub fn json_lines(&self) -> Vec<Value> {
        self.lines()
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Starts the demo server on an ephemeral port.
pub async fn start_server(config: AppConfig) -> (SocketAddr, Shutdown, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();

    let handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            server.run(listener, &shutdown).await.unwrap();
        })
    };
    (addr, shutdown, handle)
}
