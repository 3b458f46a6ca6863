//! Private relay server subsystem.
//!
//! # Data Flow
//! ```text
//! Browser / router client
//!     → request_id.rs (assign or keep x-request-id)
//!     → server.rs
//!         OPTIONS → origin check → 204 preflight
//!         other   → origin check → resolve upstream → strip hop-by-hop
//!                 → force Accept, inject secret header → forward
//!     → upstream response + CORS headers (or 502 proxy_error JSON)
//! ```
//!
//! # Design Decisions
//! - This is the "private relay" path of the router: trusted, so
//!   credentials pass through
//! - A fixed upstream is preferred; open targets are opt-in

pub mod request_id;
pub mod server;

pub use request_id::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{RelayServer, RelaySettings};
