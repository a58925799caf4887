//! Shared storage behind one context scope.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::context::fields::ContextMap;

/// Lock-protected map shared by everything running inside one scope.
///
/// Clones share the same map, so a value set by a handler is visible to the
/// response body, to spawned tasks that captured the scope, and to log
/// formatters.
#[derive(Clone, Debug, Default)]
pub struct ContextStore {
    values: Arc<Mutex<ContextMap>>,
}

impl ContextStore {
    pub fn new(initial: ContextMap) -> Self {
        Self {
            values: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.lock().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.lock().remove(key)
    }

    /// Returns a copy of every value; later changes to the store do not
    /// affect it.
    pub fn snapshot(&self) -> ContextMap {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether both handles point at the same storage.
    pub fn ptr_eq(&self, other: &ContextStore) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }

    // A panic while holding the lock cannot leave the map half-written, so
    // poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, ContextMap> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
