//! Process-wide adapter registry and the application-facing accessors.

use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::adapters::{ContextAdapter, TaskLocalAdapter};
use crate::context::fields::ContextMap;

/// Adapter used by [`set_context`], [`get_context`] and the log formatters.
///
/// Replaced atomically when a [`RequestContextLayer`](crate::http::RequestContextLayer)
/// is applied, so readers never block.
static ADAPTER: LazyLock<ArcSwap<Arc<dyn ContextAdapter>>> = LazyLock::new(|| {
    let default: Arc<dyn ContextAdapter> = Arc::new(TaskLocalAdapter);
    ArcSwap::from_pointee(default)
});

/// Installs `adapter` as the process-wide adapter.
pub fn set_adapter(adapter: Arc<dyn ContextAdapter>) {
    let previous = ADAPTER.swap(Arc::new(adapter.clone()));
    if previous.name() != adapter.name() {
        tracing::debug!(
            previous = previous.name(),
            adapter = adapter.name(),
            "Context adapter replaced"
        );
    }
}

/// Returns the process-wide adapter.
pub fn adapter() -> Arc<dyn ContextAdapter> {
    let current = ADAPTER.load();
    Arc::clone(&**current)
}

/// Stores `value` under `key` in the active scope.
///
/// Outside a scope the value is discarded.
pub fn set_context(key: impl AsRef<str>, value: impl Into<Value>) {
    adapter().set_value(key.as_ref(), value.into());
}

/// Reads `key` from the active scope.
pub fn get_context(key: impl AsRef<str>) -> Option<Value> {
    adapter().get_value(key.as_ref())
}

/// Reads `key` and deserializes it into `T`.
///
/// Returns `None` when the key is missing or holds a value of another shape.
pub fn get_context_as<T: DeserializeOwned>(key: impl AsRef<str>) -> Option<T> {
    get_context(key).and_then(|value| serde_json::from_value(value).ok())
}

/// Returns a copy of every value in the active scope.
pub fn get_full_context() -> ContextMap {
    adapter().get_all()
}
