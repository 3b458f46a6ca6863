//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Path names unique and not reserved
//! - Value ranges (timeouts, thresholds and attempt caps > 0)
//! - Public relay prefixes and relay bind address parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - A placeholder private relay endpoint is not an error; the path is just skipped

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::RouterConfig;
use crate::paths::{DIRECT_PATH, PRIVATE_RELAY_PATH};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("duplicate path name `{0}`")]
    DuplicatePath(String),

    #[error("path name `{0}` is reserved")]
    ReservedPath(String),

    #[error("public relay `{name}` has an invalid prefix `{prefix}`")]
    InvalidPrefix { name: String, prefix: String },

    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),

    #[error("invalid relay bind address `{0}`")]
    BindAddress(String),

    #[error("invalid relay target url `{0}`")]
    TargetUrl(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for relay in &config.paths.public_relays {
        if relay.name == DIRECT_PATH || relay.name == PRIVATE_RELAY_PATH {
            errors.push(ValidationError::ReservedPath(relay.name.clone()));
        } else if !seen.insert(relay.name.as_str()) {
            errors.push(ValidationError::DuplicatePath(relay.name.clone()));
        }

        let prefix_ok = url::Url::parse(&relay.prefix)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !prefix_ok {
            errors.push(ValidationError::InvalidPrefix {
                name: relay.name.clone(),
                prefix: relay.prefix.clone(),
            });
        }
    }

    let positive = [
        ("timeouts.direct_ms", config.timeouts.direct_ms),
        ("timeouts.relay_ms", config.timeouts.relay_ms),
        ("timeouts.probe_ms", config.timeouts.probe_ms),
        ("health.circuit_threshold", u64::from(config.health.circuit_threshold)),
        ("routing.max_attempts", config.routing.max_attempts as u64),
        ("prober.interval_secs", config.prober.interval_secs),
        ("relay.request_timeout_secs", config.relay.request_timeout_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if config.relay.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.relay.bind_address.clone()));
    }

    if let Some(target) = &config.relay.target_url {
        if url::Url::parse(target).is_err() {
            errors.push(ValidationError::TargetUrl(target.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
