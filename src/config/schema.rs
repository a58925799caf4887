//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files and
//! every field has a default, so an empty file is a valid configuration.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::adapters::AdapterKind;

/// Root configuration of the demo server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener settings.
    pub server: ServerConfig,

    /// Request context middleware settings.
    pub context: RequestContextConfig,

    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Kind of inbound exchange the middleware can handle.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    /// Plain HTTP request/response.
    Http,
    /// HTTP request asking for a WebSocket upgrade.
    Websocket,
}

impl ScopeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Websocket => "websocket",
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request context middleware configuration.
///
/// ID generators are code, not data; set them on
/// [`RequestContextLayer`](crate::http::RequestContextLayer).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RequestContextConfig {
    /// Response header carrying the generated request id.
    /// Inbound values of this header are ignored.
    pub request_id_header: String,

    /// Header read for an inbound correlation id and echoed on the response.
    pub correlation_id_header: String,

    /// Stamp both ids on every response.
    pub add_response_headers: bool,

    /// Exchange kinds that get a context scope; others pass through.
    pub scope_types: BTreeSet<ScopeType>,

    /// Built-in adapter installed by the middleware.
    pub adapter: AdapterKind,

    /// Keep the scope open until the response body is finished.
    pub hold_scope_for_body: bool,
}

impl Default for RequestContextConfig {
    fn default() -> Self {
        Self {
            request_id_header: "X-Request-Id".to_string(),
            correlation_id_header: "X-Correlation-Id".to_string(),
            add_response_headers: true,
            scope_types: BTreeSet::from([ScopeType::Http, ScopeType::Websocket]),
            adapter: AdapterKind::TaskLocal,
            hold_scope_for_body: true,
        }
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable line with inline `[key=value]` context.
    #[default]
    Simple,
    /// `tracing_subscriber`'s multi-line pretty printer; context appears
    /// only through span fields.
    Pretty,
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Output layout.
    pub format: LogFormat,

    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: String,

    /// JSON key the context is nested under.
    pub context_key: String,

    /// Merge context keys into the top-level JSON object instead of nesting.
    pub flatten_context: bool,

    /// Emit `timestamp`, `level` and `logger` in JSON output.
    pub include_standard_fields: bool,

    /// Context fields truncated in simple output.
    pub shorten_fields: BTreeSet<String>,

    /// Context fields omitted from simple output.
    pub hidden_fields: BTreeSet<String>,

    /// Characters kept from a shortened field.
    pub shorten_length: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Simple,
            filter: "request_context=debug,tower_http=info".to_string(),
            context_key: "context".to_string(),
            flatten_context: false,
            include_standard_fields: true,
            shorten_fields: BTreeSet::new(),
            hidden_fields: BTreeSet::new(),
            shorten_length: 8,
        }
    }
}
