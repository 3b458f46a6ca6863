//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Open state store → Build registry + health store
//!     → Build router → Spawn prober (if enabled)
//!
//! Reload (startup.rs):
//!     Config file changed → Re-apply path list to the live registry
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C / SIGTERM → Broadcast → Prober and servers exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then state, then background tasks
//! - Reload never resets health state; path names are the join key

pub mod shutdown;
pub mod startup;

pub use shutdown::{wait_for_signal, Shutdown};
pub use startup::{RouterRuntime, StartupError};
