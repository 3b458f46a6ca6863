//! Path health subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt outcome (router):
//!     failure → blacklist with trust-based TTL
//!             → circuit fail count, quarantine at threshold
//!             → per-path metrics
//!     success → clear penalties → metrics → sticky path
//!
//! Candidate ordering (state.rs):
//!     sticky first (if usable) → remaining usable paths in priority order
//!
//! Recovery (active.rs):
//!     Periodic timer
//!     → OPTIONS probe to each penalized relay
//!     → clear penalties on any answer below 500
//! ```
//!
//! # Design Decisions
//! - Blacklist, circuits and metrics are durable; the sticky path is per session
//! - Expiry is evaluated lazily against an injectable clock
//! - Storage failures never break routing; state falls back to empty

pub mod active;
pub mod blacklist;
pub mod clock;
pub mod state;

pub use active::{Prober, ProberHandle};
pub use blacklist::Blacklist;
pub use clock::{Clock, ManualClock, SystemClock};
pub use state::{Diagnostics, HealthStore, PathMetrics};
