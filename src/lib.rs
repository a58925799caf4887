//! Per-request context for axum services and `tracing` logs.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!   request ─────▶│ http::middleware   ids assigned, scope entered│
//!                 │        │                                     │
//!                 │        ▼                                     │
//!                 │ adapters ──▶ context (ContextScope / Store)  │
//!                 │        │            ▲            ▲           │
//!                 │        ▼            │            │           │
//!                 │   handler ── set_context / get_context       │
//!                 │        │                         │           │
//!                 │        ├──▶ propagation (spawn, task labels) │
//!                 │        ▼                         │           │
//!   response ◀────│ http::body  headers stamped, scope exited    │
//!                 │                                  │           │
//!                 │ observability::formatters ───────┘ log lines │
//!                 └──────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::{routing::get, Router};
//! use request_context::context::{get_context, set_context};
//! use request_context::http::{RequestContextLayer, RouterContextExt};
//!
//! async fn handler() -> String {
//!     set_context("user_id", 42);
//!     format!("{:?}", get_context("request_id"))
//! }
//!
//! let app: Router = Router::new()
//!     .route("/", get(handler))
//!     .with_request_context(RequestContextLayer::new());
//! ```

// Core
pub mod adapters;
pub mod context;
pub mod error;

// Integrations
pub mod http;
pub mod observability;
pub mod propagation;

// Demo server
pub mod config;
pub mod lifecycle;

pub use adapters::{AdapterKind, ContextAdapter, SpanAdapter, TaskLocalAdapter};
pub use context::{
    get_context, get_context_as, get_full_context, set_adapter, set_context, ContextScope,
    StandardField, WithContext,
};
pub use error::{Error, Result};
pub use http::{RequestContextLayer, RequestIds, RouterContextExt};
pub use observability::{JsonContextFormatter, SimpleContextFormatter};
pub use propagation::{TaskContextPropagator, REQUEST_CONTEXT_LABEL};
