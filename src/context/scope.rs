//! Ambient scopes: making a [`ContextStore`] visible to the code it wraps.
//!
//! # Design Decisions
//! - The active store lives in a `tokio::task_local!` slot that is installed
//!   around every poll, so it follows the future across worker threads and
//!   never leaks between tasks.
//! - A scope may also carry a `tracing::Span`, entered around the same polls.
//! - Futures, streams and response bodies share one wrapper, [`Scoped`], in
//!   the manner of `tracing::Instrumented`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use pin_project_lite::pin_project;
use tracing::Span;

use crate::context::store::ContextStore;

tokio::task_local! {
    static ACTIVE_STORE: ContextStore;
}

/// Returns the store of the innermost active scope, if any.
pub(crate) fn current_store() -> Option<ContextStore> {
    ACTIVE_STORE.try_with(ContextStore::clone).ok()
}

/// Handle to one context scope.
///
/// Produced by [`ContextAdapter::enter_context`](crate::adapters::ContextAdapter::enter_context)
/// and consumed by `exit_context`. Cloning is cheap and every clone refers to
/// the same values.
#[derive(Clone, Debug, Default)]
pub struct ContextScope {
    store: Option<ContextStore>,
    span: Option<Span>,
}

impl ContextScope {
    /// A scope whose values are read through the ambient task-local slot.
    pub fn ambient(store: ContextStore) -> Self {
        Self {
            store: Some(store),
            span: None,
        }
    }

    /// An ambient scope that additionally enters `span` while active.
    pub fn instrumented(store: ContextStore, span: Span) -> Self {
        Self {
            store: Some(store),
            span: Some(span),
        }
    }

    /// A scope that installs nothing. Adapters that keep their own storage
    /// return this from `enter_context`.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Captures whatever scope and span are active right now.
    pub fn current() -> Self {
        let span = Span::current();
        Self {
            store: current_store(),
            span: (!span.is_none()).then_some(span),
        }
    }

    pub fn store(&self) -> Option<&ContextStore> {
        self.store.as_ref()
    }

    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }

    pub fn is_detached(&self) -> bool {
        self.store.is_none() && self.span.is_none()
    }

    /// Runs `f` with this scope active.
    pub fn sync_run<R>(&self, f: impl FnOnce() -> R) -> R {
        let _entered = self.span.as_ref().map(Span::enter);
        match &self.store {
            Some(store) => ACTIVE_STORE.sync_scope(store.clone(), f),
            None => f(),
        }
    }

    /// Wraps `fut` so that every poll runs with this scope active.
    pub fn run<F: Future>(&self, fut: F) -> Scoped<F> {
        Scoped::new(fut, self.clone())
    }
}

pin_project! {
    /// A future or stream that re-enters a [`ContextScope`] each time it is
    /// polled.
    #[derive(Debug)]
    #[must_use = "scoped futures and streams do nothing unless polled"]
    pub struct Scoped<T> {
        #[pin]
        inner: T,
        scope: ContextScope,
    }
}

impl<T> Scoped<T> {
    pub fn new(inner: T, scope: ContextScope) -> Self {
        Self { inner, scope }
    }

    pub fn scope(&self) -> &ContextScope {
        &self.scope
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Future> Future for Scoped<T> {
    type Output = T::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let inner = this.inner;
        this.scope.sync_run(|| inner.poll(cx))
    }
}

impl<T: Stream> Stream for Scoped<T> {
    type Item = T::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let inner = this.inner;
        this.scope.sync_run(|| inner.poll_next(cx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Attaches context scopes to futures and streams.
pub trait WithContext: Sized {
    /// Runs `self` inside `scope`.
    fn with_context(self, scope: ContextScope) -> Scoped<Self> {
        Scoped::new(self, scope)
    }

    /// Runs `self` inside the scope active at the call site, even when it is
    /// later polled from another task.
    fn in_current_context(self) -> Scoped<Self> {
        Scoped::new(self, ContextScope::current())
    }
}

impl<T> WithContext for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use serde_json::json;

    use crate::context::fields::ContextMap;

    fn scope_with(key: &str, value: serde_json::Value) -> ContextScope {
        let mut initial = ContextMap::new();
        initial.insert(key.to_string(), value);
        ContextScope::ambient(ContextStore::new(initial))
    }

    fn read(key: &str) -> Option<serde_json::Value> {
        current_store().and_then(|store| store.get(key))
    }

    #[tokio::test]
    async fn test_no_store_outside_scope() {
        assert!(current_store().is_none());
        assert!(ContextScope::current().store().is_none());
    }

    #[tokio::test]
    async fn test_scope_survives_await_points() {
        let scope = scope_with("request_id", json!("async-test"));
        let observed = scope
            .run(async {
                tokio::task::yield_now().await;
                read("request_id")
            })
            .await;

        assert_eq!(observed, Some(json!("async-test")));
        assert!(current_store().is_none());
    }

    #[tokio::test]
    async fn test_nested_scopes_restore_outer() {
        let outer = scope_with("id", json!("outer"));
        let inner = scope_with("id", json!("inner"));

        outer
            .run(async {
                assert_eq!(read("id"), Some(json!("outer")));
                let nested = inner.run(async { read("id") }).await;
                assert_eq!(nested, Some(json!("inner")));
                assert_eq!(read("id"), Some(json!("outer")));
            })
            .await;
    }

    #[test]
    fn test_sync_run_without_runtime() {
        let scope = scope_with("key", json!("value"));
        assert_eq!(scope.sync_run(|| read("key")), Some(json!("value")));
        assert_eq!(read("key"), None);
    }

    #[test]
    fn test_detached_scope_installs_nothing() {
        let scope = ContextScope::detached();
        assert!(scope.is_detached());
        assert!(scope.sync_run(current_store).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_scopes_are_isolated() {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let scope = scope_with("n", json!(i));
                tokio::spawn(scope.run(async move {
                    for _ in 0..4 {
                        tokio::task::yield_now().await;
                        assert_eq!(read("n"), Some(json!(i)));
                    }
                }))
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_in_current_context_crosses_spawn() {
        let scope = scope_with("user_id", json!(42));
        let handle = scope
            .run(async { tokio::spawn(async { read("user_id") }.in_current_context()) })
            .await;

        assert_eq!(handle.await.unwrap(), Some(json!(42)));
    }

    #[tokio::test]
    async fn test_stream_keeps_captured_context() {
        let scope = scope_with("var", json!(42));
        let stream = scope.sync_run(|| {
            futures_util::stream::iter(0..2)
                .map(|_| read("var"))
                .in_current_context()
        });

        let items: Vec<_> = stream.collect().await;
        assert_eq!(items, vec![Some(json!(42)), Some(json!(42))]);
    }
}
