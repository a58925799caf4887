//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse CLI → Load config → Init logging → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl-C or Shutdown::trigger → Stop accepting → Drain in-flight requests → Exit
//! ```
//!
//! # Design Decisions
//! - Config and logging are initialized before the listener binds
//! - In-flight requests finish, and their context scopes exit, before the
//!   server returns

pub mod shutdown;

pub use shutdown::Shutdown;
