//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! tracing::info!(...) anywhere in a request or task
//!     → formatters (read the active context at emission time)
//!     → logging.rs (registry + EnvFilter + selected fmt layer)
//!     → stdout
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request and correlation ids reach every line without being passed
//!   to each log call

pub mod formatters;
pub mod logging;

pub use formatters::{JsonContextFormatter, SimpleContextFormatter};
