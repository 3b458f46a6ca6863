//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated)
//!     → PathRegistry / HealthStore / Router / RelayServer
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → registry paths and relay settings swapped atomically
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the path list and relay settings are hot-reloadable

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    HealthConfig, ObservabilityConfig, PathsConfig, PrivateRelayConfig, ProberConfig,
    PublicRelayConfig, RelayConfig, RouterConfig, RoutingConfig, StorageConfig, TimeoutConfig,
    TlsConfig,
};
