//! Context adapters: pluggable storage for request-scoped values.
//!
//! # Responsibilities
//! - Define the [`ContextAdapter`] contract used by the middleware, the task
//!   propagator and the log formatters
//! - Ship the task-local and span-backed adapters
//! - Guarantee that every entered scope is exited exactly once ([`ScopeExit`])
//!
//! # Design Decisions
//! - `enter_context` returns a [`ContextScope`] instead of mutating hidden
//!   state; the caller runs its work inside that scope and hands it back to
//!   `exit_context`.
//! - Adapters that keep their own storage (a database, a remote cache)
//!   return [`ContextScope::detached`] and key their state however they like.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{ContextMap, ContextScope};
use crate::error::Error;

pub mod span;
pub mod task_local;

pub use span::SpanAdapter;
pub use task_local::TaskLocalAdapter;

/// Storage strategy for request-scoped values.
pub trait ContextAdapter: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str {
        "custom"
    }

    /// Stores `value` under `key` in the active scope.
    fn set_value(&self, key: &str, value: Value);

    /// Returns the value under `key`, or `None` when unset or outside a scope.
    fn get_value(&self, key: &str) -> Option<Value>;

    /// Returns a copy of every value in the active scope.
    fn get_all(&self) -> ContextMap;

    /// Opens a new scope seeded with `initial`.
    fn enter_context(&self, initial: ContextMap) -> ContextScope;

    /// Closes a scope returned by [`enter_context`](Self::enter_context).
    fn exit_context(&self, scope: ContextScope);
}

/// Built-in adapter selector, as written in configuration files.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    #[default]
    TaskLocal,
    Span,
}

impl AdapterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaskLocal => "task_local",
            Self::Span => "span",
        }
    }

    /// Instantiates the adapter this kind names.
    pub fn build(self) -> Arc<dyn ContextAdapter> {
        match self {
            Self::TaskLocal => Arc::new(TaskLocalAdapter),
            Self::Span => Arc::new(SpanAdapter::new()),
        }
    }
}

impl FromStr for AdapterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task_local" => Ok(Self::TaskLocal),
            "span" => Ok(Self::Span),
            other => Err(Error::UnknownAdapter(other.to_string())),
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drop guard that hands a scope back to its adapter.
///
/// Whatever ends the work (normal return, an error, a panic unwinding
/// through the future, or the future being dropped) the guard calls
/// `exit_context` exactly once.
pub struct ScopeExit {
    adapter: Arc<dyn ContextAdapter>,
    scope: Option<ContextScope>,
}

impl ScopeExit {
    pub fn new(adapter: Arc<dyn ContextAdapter>, scope: ContextScope) -> Self {
        Self {
            adapter,
            scope: Some(scope),
        }
    }

    pub fn scope(&self) -> Option<&ContextScope> {
        self.scope.as_ref()
    }

    /// Exits the scope now instead of at drop.
    pub fn exit(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if let Some(scope) = self.scope.take() {
            self.adapter.exit_context(scope);
            tracing::trace!(adapter = self.adapter.name(), "Context scope exited");
        }
    }
}

impl Drop for ScopeExit {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ScopeExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeExit")
            .field("adapter", &self.adapter.name())
            .field("open", &self.scope.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingAdapter {
        exits: AtomicUsize,
    }

    impl ContextAdapter for CountingAdapter {
        fn set_value(&self, _key: &str, _value: Value) {}

        fn get_value(&self, _key: &str) -> Option<Value> {
            None
        }

        fn get_all(&self) -> ContextMap {
            ContextMap::new()
        }

        fn enter_context(&self, _initial: ContextMap) -> ContextScope {
            ContextScope::detached()
        }

        fn exit_context(&self, _scope: ContextScope) {
            self.exits.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_adapter_kind_parsing() {
        assert_eq!("task_local".parse::<AdapterKind>().unwrap(), AdapterKind::TaskLocal);
        assert_eq!("span".parse::<AdapterKind>().unwrap(), AdapterKind::Span);

        let err = "invalid".parse::<AdapterKind>().unwrap_err();
        assert!(matches!(err, Error::UnknownAdapter(ref name) if name == "invalid"));
        assert!(err.to_string().contains("unknown context adapter"));
    }

    #[test]
    fn test_adapter_kind_builds_named_adapter() {
        assert_eq!(AdapterKind::TaskLocal.build().name(), "task_local");
        assert_eq!(AdapterKind::Span.build().name(), "span");
    }

    #[test]
    fn test_scope_exit_runs_once() {
        let adapter = Arc::new(CountingAdapter::default());
        let guard = ScopeExit::new(adapter.clone(), ContextScope::detached());
        guard.exit();
        assert_eq!(adapter.exits.load(Ordering::SeqCst), 1);

        let guard = ScopeExit::new(adapter.clone(), ContextScope::detached());
        drop(guard);
        assert_eq!(adapter.exits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_scope_exit_runs_on_panic() {
        let adapter = Arc::new(CountingAdapter::default());
        let cloned = adapter.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = ScopeExit::new(cloned, ContextScope::detached());
            panic!("handler failed");
        });

        assert!(result.is_err());
        assert_eq!(adapter.exits.load(Ordering::SeqCst), 1);
    }
}
