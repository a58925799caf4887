//! Human-readable log lines with inline context.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::config::LoggingConfig;
use crate::context::{render_value, ContextMap};
use crate::observability::formatters::{event_context, EventFields};

/// Marker appended to shortened values.
const ELLIPSIS: char = '…';

/// Formats events as `TIMESTAMP LEVEL [k=v k=v] message fields`, without
/// terminal escape codes.
///
/// Long ids can be shortened and noisy fields hidden:
///
/// ```rust
/// use request_context::observability::SimpleContextFormatter;
///
/// let formatter = SimpleContextFormatter::new()
///     .shorten_fields(["request_id", "correlation_id"])
///     .hidden_fields(["user_agent"]);
/// ```
#[derive(Clone, Debug)]
pub struct SimpleContextFormatter {
    shorten_fields: BTreeSet<String>,
    hidden_fields: BTreeSet<String>,
    shorten_length: usize,
}

impl SimpleContextFormatter {
    pub fn new() -> Self {
        Self {
            shorten_fields: BTreeSet::new(),
            hidden_fields: BTreeSet::new(),
            shorten_length: 8,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self::new()
            .shorten_fields(config.shorten_fields.iter().cloned())
            .hidden_fields(config.hidden_fields.iter().cloned())
            .shorten_length(config.shorten_length)
    }

    /// Context fields truncated to `shorten_length` characters.
    pub fn shorten_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.shorten_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Context fields left out of the line.
    pub fn hidden_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.hidden_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn shorten_length(mut self, length: usize) -> Self {
        self.shorten_length = length;
        self
    }

    /// Renders `context` as `k=v k=v`, or `None` when nothing is left to show.
    fn render_context(&self, context: &ContextMap) -> Option<String> {
        let pairs: Vec<String> = context
            .iter()
            .filter(|(key, _)| !self.hidden_fields.contains(key.as_str()))
            .map(|(key, value)| {
                let mut rendered = render_value(value);
                if self.shorten_fields.contains(key.as_str()) {
                    rendered = shorten(&rendered, self.shorten_length);
                }
                format!("{key}={rendered}")
            })
            .collect();

        (!pairs.is_empty()).then(|| pairs.join(" "))
    }
}

impl Default for SimpleContextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders `message k=v k=v exception=...` as plain text.
fn render_fields(fields: EventFields) -> String {
    let mut parts: Vec<String> = fields.message.into_iter().collect();
    parts.extend(
        fields
            .fields
            .iter()
            .map(|(key, value)| format!("{key}={}", render_value(value))),
    );
    if let Some(exception) = fields.exception {
        parts.push(format!("exception={exception}"));
    }
    parts.join(" ")
}

fn shorten(value: &str, length: usize) -> String {
    if value.chars().count() <= length {
        return value.to_string();
    }
    let mut short: String = value.chars().take(length).collect();
    short.push(ELLIPSIS);
    short
}

impl<S, N> FormatEvent<S, N> for SimpleContextFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        SystemTime.format_time(&mut writer)?;
        write!(writer, " {:>5} ", event.metadata().level())?;

        if let Some(context) = self.render_context(&event_context(ctx)) {
            write!(writer, "[{context}] ")?;
        }

        writeln!(writer, "{}", render_fields(EventFields::from_event(event)))
    }
}
