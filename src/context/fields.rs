//! Context keys and values.

use std::fmt;

use serde_json::Value;

/// Insertion-ordered map of context values.
///
/// Values are JSON so that user-defined fields of any serializable type can
/// travel through logs and task labels unchanged.
pub type ContextMap = serde_json::Map<String, Value>;

/// Keys the crate sets on its own.
///
/// Application code can use any `AsRef<str>` as a key; defining an enum that
/// implements `AsRef<str>` mirrors this type for application fields.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StandardField {
    /// Unique identifier of the inbound request. Always generated.
    RequestId,
    /// Identifier spanning services; read from the inbound header or generated.
    CorrelationId,
    /// Identifier of a background task executing with propagated context.
    TaskId,
}

impl StandardField {
    pub const ALL: [StandardField; 3] = [Self::RequestId, Self::CorrelationId, Self::TaskId];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RequestId => "request_id",
            Self::CorrelationId => "correlation_id",
            Self::TaskId => "task_id",
        }
    }
}

impl AsRef<str> for StandardField {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for StandardField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders a context value for plain-text output.
///
/// Strings are written bare; every other value uses its JSON form.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
