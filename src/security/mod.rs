//! Security subsystem.
//!
//! # Responsibilities
//! - headers.rs: trust-gated header forwarding, hop-by-hop filtering
//! - access_control.rs: origin allow-list for the private relay
//!
//! # Design Decisions
//! - Credentials never reach public relays, regardless of caller input
//! - The relay validates origins before doing any upstream work

pub mod access_control;
pub mod headers;

pub use access_control::OriginPolicy;
pub use headers::{has_content_type, headers_for_trust, is_hop_by_hop};
