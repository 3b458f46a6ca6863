//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Relay listener
//!     → plain TCP (axum::serve)
//!     → or tls.rs (rustls via axum-server, PEM cert/key)
//!     → Hand off to the relay router
//! ```

pub mod tls;

pub use tls::load_tls_config;
