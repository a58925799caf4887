//! Adapter that ties context scopes to `tracing` spans.
//!
//! Entering a scope opens a `request_context` span, records the standard
//! ids as span fields and attaches the [`ContextStore`] to the span's
//! registry extensions. Every subscriber layer then prints the ids without
//! further setup, and the values follow the span wherever application code
//! propagates it (`.in_current_span()`, `Span::enter`).

use std::sync::Once;

use serde_json::Value;
use tracing::field::{display, Empty};
use tracing::{Level, Span};
use tracing_subscriber::registry::{LookupSpan, Registry};

use crate::adapters::ContextAdapter;
use crate::context::{
    current_store, render_value, ContextMap, ContextScope, ContextStore, StandardField,
};

/// Target of the spans opened by [`SpanAdapter`].
pub const SPAN_TARGET: &str = "request_context";

static DISABLED_SPAN: Once = Once::new();

/// Context adapter built on `tracing` spans.
///
/// Span extensions are only reachable when the global subscriber is built
/// on [`tracing_subscriber::Registry`]. Without one, or when a filter turns
/// off the [`SPAN_TARGET`] target, the adapter behaves like
/// [`TaskLocalAdapter`](super::TaskLocalAdapter) and warns once.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpanAdapter;

impl SpanAdapter {
    pub fn new() -> Self {
        Self
    }

    fn active_store(&self) -> Option<ContextStore> {
        current_store().or_else(|| span_store(&Span::current()))
    }
}

impl ContextAdapter for SpanAdapter {
    fn name(&self) -> &'static str {
        "span"
    }

    fn set_value(&self, key: &str, value: Value) {
        let Some(store) = self.active_store() else {
            tracing::trace!(key, "No active context scope, value discarded");
            return;
        };
        store.insert(key, value);
    }

    fn get_value(&self, key: &str) -> Option<Value> {
        self.active_store()?.get(key)
    }

    fn get_all(&self) -> ContextMap {
        self.active_store()
            .map(|store| store.snapshot())
            .unwrap_or_default()
    }

    fn enter_context(&self, initial: ContextMap) -> ContextScope {
        // Opened at ERROR so that a level filter such as `warn` keeps it.
        let span = tracing::span!(
            target: SPAN_TARGET,
            Level::ERROR,
            "request_context",
            request_id = Empty,
            correlation_id = Empty,
            task_id = Empty,
        );
        if span.is_disabled() {
            DISABLED_SPAN.call_once(|| {
                tracing::warn!(
                    span_target = SPAN_TARGET,
                    "Context span disabled by the log filter, context stays task-local"
                );
            });
        }
        for field in StandardField::ALL {
            if let Some(value) = initial.get(field.as_str()) {
                span.record(field.as_str(), display(render_value(value)));
            }
        }

        let store = ContextStore::new(initial);
        attach_store(&span, &store);
        ContextScope::instrumented(store, span)
    }

    // The span closes when its last clone is dropped; the scope handed back
    // here is one of those clones.
    fn exit_context(&self, scope: ContextScope) {
        drop(scope);
    }
}

/// Stores `store` in the registry extensions of `span`.
fn attach_store(span: &Span, store: &ContextStore) {
    let attached = span.with_subscriber(|(id, dispatch)| {
        let Some(registry) = dispatch.downcast_ref::<Registry>() else {
            return false;
        };
        match registry.span(id) {
            Some(span_ref) => {
                span_ref.extensions_mut().insert(store.clone());
                true
            }
            None => false,
        }
    });

    if attached != Some(true) {
        tracing::trace!("Context span not backed by a registry, store kept task-local only");
    }
}

/// Finds the nearest store attached to `span` or one of its parents.
pub(crate) fn span_store(span: &Span) -> Option<ContextStore> {
    span.with_subscriber(|(id, dispatch)| {
        let registry = dispatch.downcast_ref::<Registry>()?;
        let span_ref = registry.span(id)?;
        span_ref
            .scope()
            .find_map(|ancestor| ancestor.extensions().get::<ContextStore>().cloned())
    })
    .flatten()
}
