//! Adaptive multi-path HTTP request router.
//!
//! Sends API requests to a remote service over the healthiest available
//! path (direct, a trusted private relay, or public relays), with
//! blacklisting, circuit breaking, a session-sticky path and background
//! recovery probing. Also ships the private relay server itself.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod paths;
pub mod relay;
pub mod resilience;
pub mod routing;
pub mod security;
pub mod storage;
pub mod transport;

pub use config::RouterConfig;
pub use lifecycle::{RouterRuntime, Shutdown};
pub use routing::{RouteError, Router};
pub use transport::{RequestBody, ResponseBody, RouteRequest};
