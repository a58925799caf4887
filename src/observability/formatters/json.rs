//! One JSON object per log line.

use std::fmt;

use serde_json::Value;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::config::LoggingConfig;
use crate::context::ContextMap;
use crate::observability::formatters::{event_context, EventFields};

/// JSON event formatter with the request context attached.
///
/// ```json
/// {"timestamp":"2025-01-01T12:00:00.000000Z","level":"INFO","logger":"app",
///  "message":"User fetched","user_id":42,"context":{"request_id":"…"}}
/// ```
#[derive(Clone, Debug)]
pub struct JsonContextFormatter {
    context_key: Option<String>,
    include_standard_fields: bool,
}

impl JsonContextFormatter {
    /// Nested under `"context"`, standard fields included.
    pub fn new() -> Self {
        Self {
            context_key: Some("context".to_string()),
            include_standard_fields: true,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        let context_key = (!config.flatten_context).then(|| config.context_key.clone());
        Self::new()
            .context_key(context_key)
            .include_standard_fields(config.include_standard_fields)
    }

    /// Key the context object is nested under; `None` merges the context
    /// keys into the top-level object.
    pub fn context_key(mut self, key: Option<impl Into<String>>) -> Self {
        self.context_key = key.map(Into::into);
        self
    }

    /// Emit `timestamp`, `level` and `logger`.
    pub fn include_standard_fields(mut self, include: bool) -> Self {
        self.include_standard_fields = include;
        self
    }

    fn build_record(&self, event: &Event<'_>, context: ContextMap) -> ContextMap {
        let metadata = event.metadata();
        let mut record = ContextMap::new();

        if self.include_standard_fields {
            let mut timestamp = String::new();
            if SystemTime.format_time(&mut Writer::new(&mut timestamp)).is_ok() {
                record.insert("timestamp".into(), Value::String(timestamp));
            }
            record.insert("level".into(), Value::String(metadata.level().as_str().to_string()));
            record.insert("logger".into(), Value::String(metadata.target().to_string()));
        }

        let fields = EventFields::from_event(event);
        record.insert("message".into(), Value::String(fields.message.unwrap_or_default()));
        for (key, value) in fields.fields {
            record.entry(key).or_insert(value);
        }
        if let Some(exception) = fields.exception {
            record.insert("exception".into(), Value::String(exception));
        }

        if !context.is_empty() {
            match &self.context_key {
                Some(key) => {
                    record.insert(key.clone(), Value::Object(context));
                }
                None => record.extend(context),
            }
        }
        record
    }
}

impl Default for JsonContextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, N> FormatEvent<S, N> for JsonContextFormatter
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
        let record = self.build_record(event, event_context(ctx));
        let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::context::{set_context, ContextScope, ContextStore};
    use crate::observability::formatters::test_support::capture;

    fn scope(pairs: Value) -> ContextScope {
        let Value::Object(initial) = pairs else {
            panic!("object expected");
        };
        ContextScope::ambient(ContextStore::new(initial))
    }

    #[test]
    fn test_basic_formatting() {
        let lines = capture(JsonContextFormatter::new(), || {
            tracing::info!(target: "test", "Test message");
        });

        let data: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(data["message"], "Test message");
        assert_eq!(data["level"], "INFO");
        assert_eq!(data["logger"], "test");
        assert!(data["timestamp"].as_str().unwrap().ends_with('Z'));
        assert!(data.get("context").is_none());
    }

    #[test]
    fn test_context_nested_by_default() {
        let lines = capture(JsonContextFormatter::new(), || {
            scope(json!({"request_id": "test-123"})).sync_run(|| {
                set_context("user_id", 456);
                tracing::info!("Test message");
            });
        });

        let data: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(data["context"], json!({"request_id": "test-123", "user_id": 456}));
    }

    #[test]
    fn test_flat_context_merge() {
        let formatter = JsonContextFormatter::new().context_key(None::<String>);
        let lines = capture(formatter, || {
            scope(json!({"request_id": "test-123", "user_id": 456})).sync_run(|| {
                tracing::info!("Test message");
            });
        });

        let data: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(data["request_id"], "test-123");
        assert_eq!(data["user_id"], 456);
        assert!(data.get("context").is_none());
    }

    #[test]
    fn test_custom_context_key() {
        let formatter = JsonContextFormatter::new().context_key(Some("ctx"));
        let lines = capture(formatter, || {
            scope(json!({"request_id": "test-123"})).sync_run(|| tracing::info!("Test message"));
        });

        let data: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(data["ctx"]["request_id"], "test-123");
    }

    #[test]
    fn test_exclude_standard_fields() {
        let formatter = JsonContextFormatter::new().include_standard_fields(false);
        let lines = capture(formatter, || tracing::info!("Test message"));

        let data: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(data, json!({"message": "Test message"}));
    }

    #[test]
    fn test_extra_fields_and_exception() {
        let lines = capture(JsonContextFormatter::new(), || {
            let err = std::io::Error::new(std::io::ErrorKind::InvalidData, "Test error");
            tracing::error!(
                error = &err as &(dyn std::error::Error + 'static),
                attempts = 3u64,
                ok = false,
                "An error occurred"
            );
        });

        let data: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(data["message"], "An error occurred");
        assert_eq!(data["exception"], "Test error");
        assert_eq!(data["attempts"], 3);
        assert_eq!(data["ok"], false);
        assert_eq!(data["level"], "ERROR");
    }

    #[test]
    fn test_from_config() {
        let config = LoggingConfig {
            flatten_context: true,
            include_standard_fields: false,
            ..LoggingConfig::default()
        };
        let formatter = JsonContextFormatter::from_config(&config);
        assert_eq!(formatter.context_key, None);
        assert!(!formatter.include_standard_fields);
    }
}
