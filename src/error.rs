//! Crate-wide error type.
//!
//! Request-level problems (a malformed inbound correlation header, an id
//! that cannot be encoded as a header value) are never errors: the
//! middleware falls back to generated values or skips the header. This type
//! covers setup and carrier failures.

use axum::http::header::InvalidHeaderName;

use crate::config::ConfigError;

/// Errors returned by request-context's fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A context adapter was selected by a name that is not built in.
    #[error("unknown context adapter `{0}`, expected `task_local` or `span`")]
    UnknownAdapter(String),

    /// A configured header name is not a valid HTTP header name.
    #[error("invalid header name `{name}`")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: InvalidHeaderName,
    },

    /// The current context could not be serialized into a task label.
    #[error("failed to encode propagated context")]
    Encode(#[source] serde_json::Error),

    /// A task label did not contain valid JSON.
    #[error("failed to decode propagated context")]
    Decode(#[source] serde_json::Error),

    /// A task label contained JSON that is not an object.
    #[error("propagated context must be a JSON object")]
    InvalidCarrier,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to install logging subscriber")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias defaulting to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
