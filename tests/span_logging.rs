//! Log lines emitted while serving requests carry the request context.
//!
//! This binary installs the span adapter; the task-local store is still
//! consulted first, so plain handler code behaves exactly as with the
//! default adapter.

mod common;

use axum::routing::get;
use axum::Router;
use serde_json::Value;
use tracing::Instrument;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;

use common::{get_request, send, sequence, Capture};
use request_context::config::{LogFormat, LoggingConfig, RequestContextConfig};
use request_context::http::{RequestContextLayer, RouterContextExt};
use request_context::observability::logging::fmt_layer;
use request_context::{get_context, AdapterKind};

fn span_layer(prefix: &'static str) -> RequestContextLayer {
    let config = RequestContextConfig {
        adapter: AdapterKind::Span,
        ..RequestContextConfig::default()
    };
    RequestContextLayer::from_config(&config)
        .unwrap()
        .request_id_generator(sequence(prefix))
}

fn routes() -> Router {
    Router::new()
        .route(
            "/",
            get(|| async {
                tracing::info!(target: "app", "Handling request");
                "ok"
            }),
        )
        .route(
            "/background",
            get(|| async {
                // Only the span travels with this task, not the task-local slot.
                let seen = tokio::spawn(
                    async {
                        tracing::warn!(target: "app", "Background work");
                        get_context("request_id")
                    }
                    .in_current_span(),
                )
                .await
                .unwrap();
                seen.and_then(|v| v.as_str().map(String::from)).unwrap_or_default()
            }),
        )
}

fn subscriber(format: LogFormat, writer: Capture) -> impl tracing::Subscriber + Send + Sync {
    let config = LoggingConfig {
        format,
        shorten_fields: ["correlation_id".to_string()].into(),
        ..LoggingConfig::default()
    };
    tracing_subscriber::registry().with(fmt_layer(&config, writer))
}

fn app_lines(lines: Vec<Value>, message: &str) -> Vec<Value> {
    lines.into_iter().filter(|line| line["message"] == message).collect()
}

#[tokio::test]
async fn test_json_lines_carry_context() {
    let writer = Capture::default();
    let _default = tracing::subscriber::set_default(subscriber(LogFormat::Json, writer.clone()));

    let response = send(routes().with_request_context(span_layer("json")), get_request("/")).await;
    assert_eq!(response.header("x-request-id"), Some("json-1"));

    let lines = app_lines(writer.json_lines(), "Handling request");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["logger"], "app");
    assert_eq!(lines[0]["context"]["request_id"], "json-1");
    assert_eq!(
        lines[0]["context"]["correlation_id"],
        response.header("x-correlation-id").unwrap()
    );
}

#[tokio::test]
async fn test_context_follows_span_into_spawned_task() {
    let writer = Capture::default();
    let _default = tracing::subscriber::set_default(subscriber(LogFormat::Json, writer.clone()));

    let response = send(
        routes().with_request_context(span_layer("bg")),
        get_request("/background"),
    )
    .await;

    assert_eq!(response.body, "bg-1");
    let lines = app_lines(writer.json_lines(), "Background work");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["context"]["request_id"], "bg-1");
}

#[tokio::test]
async fn test_context_survives_warn_level_filter() {
    let writer = Capture::default();
    let config = LoggingConfig {
        format: LogFormat::Json,
        ..LoggingConfig::default()
    };
    let subscriber = tracing_subscriber::registry()
        .with(LevelFilter::WARN)
        .with(fmt_layer(&config, writer.clone()));
    let _default = tracing::subscriber::set_default(subscriber);

    let response = send(
        routes().with_request_context(span_layer("warn")),
        get_request("/background"),
    )
    .await;

    assert_eq!(response.body, "warn-1");
    let lines = app_lines(writer.json_lines(), "Background work");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["level"], "WARN");
    assert_eq!(lines[0]["context"]["request_id"], "warn-1");
}

#[tokio::test]
async fn test_simple_lines_carry_context() {
    let writer = Capture::default();
    let _default = tracing::subscriber::set_default(subscriber(LogFormat::Simple, writer.clone()));

    let correlation = "0123456789abcdef";
    let request = axum::http::Request::get("/")
        .header("x-correlation-id", correlation)
        .body(axum::body::Body::empty())
        .unwrap();
    send(routes().with_request_context(span_layer("simple")), request).await;

    let lines = writer.lines();
    let line = lines.iter().find(|l| l.contains("Handling request")).unwrap();
    assert!(line.contains("[request_id=simple-1 correlation_id=01234567…] Handling request"));
}

#[tokio::test]
async fn test_no_context_outside_requests() {
    let writer = Capture::default();
    let _default = tracing::subscriber::set_default(subscriber(LogFormat::Json, writer.clone()));

    tracing::info!(target: "app", "Startup");

    let lines = app_lines(writer.json_lines(), "Startup");
    assert!(lines[0].get("context").is_none());
}
