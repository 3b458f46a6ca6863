//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt on a path:
//!     → timeouts.rs (budget by trust level)
//!     → On failure: circuit_breaker.rs (count, open circuit at threshold)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt and probe has a deadline
//! - No automatic retry of the same path within one route() call
//! - Circuit breaker keeps repeatedly failing paths out of rotation

pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{CircuitPolicy, CircuitState, CircuitTable};
