//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber
//! - Select the event format (JSON, simple, pretty) from [`LoggingConfig`]
//! - Configure log level from `RUST_LOG` or the configured filter
//!
//! # Design Decisions
//! - The subscriber is always built on `tracing_subscriber::Registry`, so the
//!   span adapter can attach context to span extensions
//! - JSON format for production, simple or pretty format for development

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::Result;
use crate::observability::formatters::{JsonContextFormatter, SimpleContextFormatter};

/// Builds the formatting layer selected by `config`, writing to `writer`.
///
/// JSON and simple lines carry no terminal escape codes; pretty output keeps
/// its colors.
pub fn fmt_layer<S, W>(config: &LoggingConfig, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer().with_writer(writer);
    match config.format {
        LogFormat::Json => layer
            .with_ansi(false)
            .event_format(JsonContextFormatter::from_config(config))
            .boxed(),
        LogFormat::Simple => layer
            .with_ansi(false)
            .event_format(SimpleContextFormatter::from_config(config))
            .boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over
/// `config.filter`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(config, std::io::stdout))
        .try_init()?;

    tracing::debug!(format = ?config.format, "Logging initialized");
    Ok(())
}
