//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check header names are valid and distinct
//! - Validate value ranges (timeouts > 0, shorten length > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;

use axum::http::HeaderName;

use crate::config::schema::{AppConfig, LoggingConfig, RequestContextConfig, ServerConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validates a full configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_server(&config.server, &mut errors);
    check_context(&config.context, &mut errors);
    check_logging(&config.logging, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates only the middleware section.
pub fn validate_context_config(config: &RequestContextConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_context(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_server(server: &ServerConfig, errors: &mut Vec<ValidationError>) {
    if server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("`{}` is not a socket address", server.bind_address),
        ));
    }
    if server.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "server.request_timeout_secs",
            "must be greater than zero",
        ));
    }
}

fn check_context(context: &RequestContextConfig, errors: &mut Vec<ValidationError>) {
    let request = HeaderName::try_from(context.request_id_header.as_str());
    let correlation = HeaderName::try_from(context.correlation_id_header.as_str());

    if request.is_err() {
        errors.push(ValidationError::new(
            "context.request_id_header",
            format!("`{}` is not a valid header name", context.request_id_header),
        ));
    }
    if correlation.is_err() {
        errors.push(ValidationError::new(
            "context.correlation_id_header",
            format!("`{}` is not a valid header name", context.correlation_id_header),
        ));
    }
    if let (Ok(request), Ok(correlation)) = (request, correlation) {
        if request == correlation {
            errors.push(ValidationError::new(
                "context.correlation_id_header",
                "must differ from request_id_header",
            ));
        }
    }
    if context.scope_types.is_empty() {
        errors.push(ValidationError::new(
            "context.scope_types",
            "at least one scope type is required",
        ));
    }
}

fn check_logging(logging: &LoggingConfig, errors: &mut Vec<ValidationError>) {
    if logging.shorten_length == 0 {
        errors.push(ValidationError::new("logging.shorten_length", "must be greater than zero"));
    }
    if !logging.flatten_context && logging.context_key.is_empty() {
        errors.push(ValidationError::new(
            "logging.context_key",
            "must not be empty unless flatten_context is set",
        ));
    }
}
