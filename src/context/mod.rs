//! Request-scoped context values.
//!
//! # Data Flow
//! ```text
//! adapter.enter_context(initial values)
//!     → ContextScope { ContextStore, optional Span }
//!     → scope.run(fut) / Scoped<T> installs the store around every poll
//!     → set_context / get_context / get_full_context read and write it
//!     → adapter.exit_context(scope)
//! ```
//!
//! # Design Decisions
//! - Values are `serde_json::Value` so user fields keep their type in JSON
//!   logs and task labels.
//! - Accessors go through the process-wide adapter; the built-in adapters
//!   all read the task-local store first.

pub mod fields;
pub mod registry;
pub mod scope;
pub mod store;

pub use fields::{render_value, ContextMap, StandardField};
pub use registry::{
    adapter, get_context, get_context_as, get_full_context, set_adapter, set_context,
};
pub use scope::{ContextScope, Scoped, WithContext};
pub use store::ContextStore;

pub(crate) use scope::current_store;
