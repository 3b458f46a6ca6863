//! Transport subsystem.
//!
//! # Data Flow
//! ```text
//! Router picks a path
//!     → request.rs (caller request, body encoding)
//!     → client.rs (call URL, trust-filtered headers, POST with deadline)
//!     → response.rs (tolerant JSON/text parsing)
//!     → Attempt { result, elapsed } back to the router
//! ```

pub mod client;
pub mod request;
pub mod response;

pub use client::{Attempt, HttpTransport, Transport, TransportError};
pub use request::{RequestBody, RouteRequest};
pub use response::ResponseBody;
