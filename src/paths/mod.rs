//! Transport path registry.
//!
//! # Data Flow
//! ```text
//! PathsConfig (+ persisted private relay override)
//!     → registry.rs builds the ordered path list:
//!         direct → private relay → public relays (config order)
//!     → HealthStore filters/reorders it per route() call
//!     → path.rs derives the concrete call URL per attempt
//! ```
//!
//! # Design Decisions
//! - Paths are immutable values; the list is swapped atomically on change
//! - Only the private relay endpoint is mutable at runtime
//! - An unconfigured private relay stays in the list but is never attempted

pub mod path;
pub mod registry;

pub use path::{Endpoint, TargetEncoding, TransportPath, Trust, DIRECT_PATH, PRIVATE_RELAY_PATH};
pub use registry::{
    parse_endpoint, PathRegistry, PRIVATE_RELAY_BASELINE_KEY, PRIVATE_RELAY_OVERRIDE_KEY,
};
