//! Log formatters that stamp the request context on every event.
//!
//! Both formatters read the context when the event is emitted: first through
//! the installed adapter (the task-local scope), then from a
//! [`ContextStore`] attached to one of the event's spans, which is where the
//! span adapter keeps it.

use std::fmt;

use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::context::{self, ContextMap, ContextStore};

pub mod json;
pub mod simple;

pub use json::JsonContextFormatter;
pub use simple::SimpleContextFormatter;

/// Context visible to `event`.
pub(crate) fn event_context<S, N>(ctx: &FmtContext<'_, S, N>) -> ContextMap
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    let ambient = context::adapter().get_all();
    if !ambient.is_empty() {
        return ambient;
    }

    ctx.event_scope()
        .and_then(|mut scope| {
            scope.find_map(|span| {
                span.extensions()
                    .get::<ContextStore>()
                    .map(ContextStore::snapshot)
            })
        })
        .unwrap_or_default()
}

/// Event fields split into message, error and the rest.
#[derive(Debug, Default)]
pub(crate) struct EventFields {
    pub message: Option<String>,
    pub exception: Option<String>,
    pub fields: ContextMap,
}

impl EventFields {
    pub fn from_event(event: &Event<'_>) -> Self {
        let mut visitor = Self::default();
        event.record(&mut visitor);
        visitor
    }

    fn insert(&mut self, field: &Field, value: Value) {
        match field.name() {
            "message" => self.message = Some(render(value)),
            "error" | "exception" => self.exception = Some(render(value)),
            name => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }
}

fn render(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl Visit for EventFields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        let mut rendered = value.to_string();
        let mut source = value.source();
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        self.insert(field, Value::String(rendered));
    }
}
