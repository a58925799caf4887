//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → middleware.rs (ids assigned, scope entered)
//!     → handler (get_context / set_context / RequestIds extractor)
//!     → middleware.rs (response headers stamped)
//!     → body.rs (body streamed inside the scope, scope exited at end)
//!     → Send to client
//! ```

pub mod body;
pub mod ids;
pub mod middleware;
pub mod server;

pub use body::ContextBody;
pub use ids::{uuid_v4, IdGenerator, RequestIds};
pub use middleware::{request_context, RequestContextLayer, RouterContextExt};
pub use server::HttpServer;
