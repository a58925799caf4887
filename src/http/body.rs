//! Response body that keeps the request's context scope open.
//!
//! Streaming handlers produce frames after the middleware has returned the
//! response head. [`ContextBody`] re-enters the scope around every
//! `poll_frame` and releases it when the stream ends, fails or is dropped.

use std::pin::Pin;
use std::task::{Context, Poll};

use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;

use crate::adapters::ScopeExit;
use crate::context::ContextScope;

pin_project! {
    /// Body wrapper that polls `inner` inside a context scope.
    #[derive(Debug)]
    pub struct ContextBody<B> {
        #[pin]
        inner: B,
        scope: ContextScope,
        exit: Option<ScopeExit>,
    }
}

impl<B> ContextBody<B> {
    /// Wraps `inner`; the scope held by `exit` is exited once the body is
    /// finished.
    pub fn new(inner: B, exit: ScopeExit) -> Self {
        let scope = exit.scope().cloned().unwrap_or_default();
        Self {
            inner,
            scope,
            exit: Some(exit),
        }
    }

    /// Whether the scope is still open.
    pub fn is_open(&self) -> bool {
        self.exit.is_some()
    }
}

impl<B: Body> Body for ContextBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();
        let inner = this.inner;
        let polled = this.scope.sync_run(|| inner.poll_frame(cx));

        if matches!(polled, Poll::Ready(None) | Poll::Ready(Some(Err(_)))) {
            if let Some(exit) = this.exit.take() {
                exit.exit();
            }
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
