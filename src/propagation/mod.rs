//! Context propagation across background task boundaries.
//!
//! # Data Flow
//! ```text
//! request handler (scope active)
//!     → TaskContextPropagator::inject (context → JSON label, minus request_id)
//!     → broker / queue message labels
//!     → worker: TaskContextPropagator::enter / run (label → new scope + task_id)
//!     → TaskScope dropped → scope exited
//! ```
//!
//! # Design Decisions
//! - Broker-agnostic: labels are a plain string map any queue can carry
//! - `request_id` identifies one HTTP exchange and is never propagated;
//!   `correlation_id` and custom fields are
//! - In-process background work uses [`spawn`], which carries the scope
//!   directly without serialization

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::adapters::{ContextAdapter, ScopeExit};
use crate::context::{
    adapter, get_full_context, ContextMap, ContextScope, StandardField, WithContext,
};
use crate::error::{Error, Result};

/// Label carrying the serialized context.
pub const REQUEST_CONTEXT_LABEL: &str = "X-Request-Context";

/// String labels attached to a task message.
pub type TaskLabels = HashMap<String, String>;

/// Moves request context into task labels and back out on the worker side.
#[derive(Clone, Copy, Debug, Default)]
pub struct TaskContextPropagator;

impl TaskContextPropagator {
    /// Writes the current context, without `request_id`, into
    /// [`REQUEST_CONTEXT_LABEL`]. Other labels are left untouched; an empty
    /// context is written as `{}`.
    pub fn inject(labels: &mut TaskLabels) -> Result<()> {
        let mut context = get_full_context();
        context.remove(StandardField::RequestId.as_str());

        let encoded = serde_json::to_string(&context).map_err(Error::Encode)?;
        labels.insert(REQUEST_CONTEXT_LABEL.to_string(), encoded);

        tracing::trace!(fields = context.len(), "Context injected into task labels");
        Ok(())
    }

    /// Decodes the context carried by `labels` and adds `task_id`.
    ///
    /// A missing label yields a context holding only the task id.
    pub fn extract(task_id: &str, labels: &TaskLabels) -> Result<ContextMap> {
        let mut context = match labels.get(REQUEST_CONTEXT_LABEL) {
            None => ContextMap::new(),
            Some(raw) => match serde_json::from_str(raw).map_err(Error::Decode)? {
                Value::Object(map) => map,
                _ => return Err(Error::InvalidCarrier),
            },
        };
        context.insert(
            StandardField::TaskId.to_string(),
            Value::String(task_id.to_string()),
        );
        Ok(context)
    }

    /// Opens a scope for `task_id` through the installed adapter.
    pub fn enter(task_id: &str, labels: &TaskLabels) -> Result<TaskScope> {
        let context = Self::extract(task_id, labels)?;
        let adapter = adapter();
        let scope = adapter.enter_context(context);

        tracing::debug!(task_id, adapter = adapter.name(), "Task context scope entered");
        Ok(TaskScope::new(adapter, scope))
    }

    /// Runs `fut` inside the context carried by `labels`.
    pub async fn run<F: Future>(task_id: &str, labels: &TaskLabels, fut: F) -> Result<F::Output> {
        let task = Self::enter(task_id, labels)?;
        Ok(task.run(fut).await)
    }
}

/// An open task scope; dropping it exits the scope.
#[derive(Debug)]
pub struct TaskScope {
    scope: ContextScope,
    exit: ScopeExit,
}

impl TaskScope {
    fn new(adapter: Arc<dyn ContextAdapter>, scope: ContextScope) -> Self {
        Self {
            exit: ScopeExit::new(adapter, scope.clone()),
            scope,
        }
    }

    pub fn scope(&self) -> &ContextScope {
        &self.scope
    }

    /// Runs `f` with the task context active.
    pub fn sync_run<R>(&self, f: impl FnOnce() -> R) -> R {
        self.scope.sync_run(f)
    }

    /// Runs `fut` with the task context active, then exits the scope.
    pub async fn run<F: Future>(self, fut: F) -> F::Output {
        let output = self.scope.run(fut).await;
        self.exit.exit();
        output
    }
}

/// Spawns `fut` on the Tokio runtime, carrying the current context scope.
pub fn spawn<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(fut.in_current_context())
}
