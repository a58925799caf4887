//! Demo HTTP server.
//!
//! # Responsibilities
//! - Create the Axum Router with the demo handlers
//! - Wire up middleware (request context, tracing, timeout)
//! - Bind to a listener and serve until shutdown
//!
//! Routes:
//! - `GET /`            ids of the current request
//! - `GET /context`     full context, after adding a custom field
//! - `GET /users/{id}`  stores `user_id`, hands work to a background task
//! - `GET /stream`      streaming body produced inside the request scope
//! - `GET /healthz`     liveness probe

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::Path;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::context::{get_context, get_full_context, set_context, StandardField};
use crate::error::Result;
use crate::http::{RequestContextLayer, RequestIds, RouterContextExt};
use crate::lifecycle::Shutdown;
use crate::propagation::{self, TaskContextPropagator, TaskLabels};

/// HTTP server for the request context demo.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        let layer = RequestContextLayer::from_config(&config.context)?;
        let router = Self::build_router(&config, layer);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The context layer is outermost so request traces are logged inside
    /// the request's scope.
    #[allow(deprecated)]
    pub fn build_router(config: &AppConfig, layer: RequestContextLayer) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/context", get(full_context))
            .route("/users/{id}", get(get_user))
            .route("/stream", get(stream))
            .route("/healthz", get(|| async { "ok" }))
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
            .with_request_context(layer)
    }

    /// The router, for serving it elsewhere or calling it in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// Ctrl-C or `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            adapter = %self.config.context.adapter,
            "HTTP server starting"
        );

        let mut stop = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = stop.recv() => {}
                }
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Wait for Ctrl-C; never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

async fn root() -> Json<Value> {
    tracing::info!("Processing root request");
    Json(json!({
        "message": "Hello",
        "request_id": get_context(StandardField::RequestId),
        "correlation_id": get_context(StandardField::CorrelationId),
    }))
}

async fn full_context(ids: RequestIds) -> Json<Value> {
    set_context("path", "/context");
    tracing::info!(request_id = %ids.request_id, "Returning full context");
    Json(Value::Object(get_full_context()))
}

async fn get_user(Path(id): Path<u64>) -> Json<Value> {
    set_context("user_id", id);
    tracing::info!("Fetching user");

    // Hand the audit work to a background task; it logs with the same ids.
    propagation::spawn(async move {
        tracing::info!(user_id = id, "Auditing user lookup");
    });

    let mut labels = TaskLabels::new();
    if let Err(e) = TaskContextPropagator::inject(&mut labels) {
        tracing::warn!(error = %e, "Failed to prepare task labels");
    }

    Json(json!({
        "user_id": id,
        "request_id": get_context(StandardField::RequestId),
        "task_labels": labels,
    }))
}

async fn stream() -> Response {
    let chunks = futures_util::stream::iter(0..3).then(|i| async move {
        tokio::task::yield_now().await;
        let request_id = get_context(StandardField::RequestId).unwrap_or(Value::Null);
        tracing::debug!(chunk = i, "Streaming chunk");
        let line = json!({"chunk": i, "request_id": request_id});
        Ok::<_, std::convert::Infallible>(Bytes::from(format!("{line}\n")))
    });
    Response::new(Body::from_stream(chunks))
}
