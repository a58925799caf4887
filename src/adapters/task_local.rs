//! Default adapter: values live in the runtime's task-local slot.

use serde_json::Value;

use crate::adapters::ContextAdapter;
use crate::context::{current_store, ContextMap, ContextScope, ContextStore};

/// Adapter backed by the `tokio` task-local slot installed by
/// [`ContextScope`].
///
/// Needs no subscriber or external service. Every task sees only the scope
/// it runs in; code on a blocking thread sees nothing unless it is wrapped
/// in [`ContextScope::sync_run`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TaskLocalAdapter;

impl ContextAdapter for TaskLocalAdapter {
    fn name(&self) -> &'static str {
        "task_local"
    }

    fn set_value(&self, key: &str, value: Value) {
        match current_store() {
            Some(store) => store.insert(key, value),
            None => tracing::trace!(key, "No active context scope, value discarded"),
        }
    }

    fn get_value(&self, key: &str) -> Option<Value> {
        current_store()?.get(key)
    }

    fn get_all(&self) -> ContextMap {
        current_store().map(|store| store.snapshot()).unwrap_or_default()
    }

    fn enter_context(&self, initial: ContextMap) -> ContextScope {
        ContextScope::ambient(ContextStore::new(initial))
    }

    // The slot is uninstalled when the scoped future stops being polled, so
    // there is nothing to release here. Tasks that captured the scope keep
    // their values.
    fn exit_context(&self, _scope: ContextScope) {}
}
