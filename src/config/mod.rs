//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → RequestContextLayer / logging::init / HttpServer
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Callables (id generators, custom adapters) are set in code, never in files

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AppConfig, LogFormat, LoggingConfig, RequestContextConfig, ScopeType, ServerConfig,
};
pub use validation::{validate_config, validate_context_config, ValidationError};
