//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! RouteRequest { target_url, headers, body }
//!     → matcher.rs (local target?)
//!     → HealthStore::ordered_candidates (sticky first, penalized removed)
//!     → router.rs: for each candidate, up to max_attempts:
//!         skip relays for local targets, skip unconfigured relays
//!         Transport::attempt with trust-based timeout
//!         success → record_success, return
//!         failure → record_failure, next candidate
//!     → RouteError::Exhausted { last_error }
//! ```
//!
//! # Design Decisions
//! - Candidates are tried strictly one at a time; a payload is never sent
//!   to several relays concurrently
//! - At most one attempt per path per call
//! - A failing local target is reported as-is; relays cannot fix it

pub mod matcher;
pub mod router;

pub use matcher::is_local_target;
pub use router::{RouteError, Router};
