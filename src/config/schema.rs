//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router
//! and the private relay server. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::paths::TargetEncoding;

/// Root configuration for the router and relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Transport path definitions.
    pub paths: PathsConfig,

    /// Blacklist and circuit breaker tuning.
    pub health: HealthConfig,

    /// Per-trust attempt timeouts.
    pub timeouts: TimeoutConfig,

    /// Routing loop settings.
    pub routing: RoutingConfig,

    /// Background prober settings.
    pub prober: ProberConfig,

    /// Where health state is persisted.
    pub storage: StorageConfig,

    /// Private relay server settings.
    pub relay: RelayConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Transport path definitions.
///
/// The direct path is always present and needs no configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Trusted relay that forwards to a preconfigured destination.
    pub private_relay: PrivateRelayConfig,

    /// Third-party relays, tried in the order listed.
    pub public_relays: Vec<PublicRelayConfig>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            private_relay: PrivateRelayConfig::default(),
            public_relays: vec![
                PublicRelayConfig {
                    name: "isomorphic-git".to_string(),
                    prefix: "https://cors.isomorphic-git.org/".to_string(),
                    encoding: TargetEncoding::Suffix,
                },
                PublicRelayConfig {
                    name: "corsproxy".to_string(),
                    prefix: "https://corsproxy.io/?".to_string(),
                    encoding: TargetEncoding::Encoded,
                },
            ],
        }
    }
}

/// Private relay endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PrivateRelayConfig {
    /// Relay endpoint URL. Empty or template values leave the path unusable.
    pub endpoint: String,
}

impl Default for PrivateRelayConfig {
    fn default() -> Self {
        Self {
            // Placeholder: the path stays disabled until a real endpoint is set.
            endpoint: "https://<your-relay>.workers.dev/".to_string(),
        }
    }
}

/// Public relay definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublicRelayConfig {
    /// Unique path name.
    pub name: String,

    /// URL prefix the target is appended to.
    pub prefix: String,

    /// How the target URL is appended to the prefix.
    #[serde(default)]
    pub encoding: TargetEncoding,
}

/// Blacklist and circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Blacklist TTL after a failed direct attempt, in seconds.
    pub direct_blacklist_secs: u64,

    /// Blacklist TTL after a failed relay attempt, in seconds.
    pub relay_blacklist_secs: u64,

    /// Consecutive failures that open the circuit.
    pub circuit_threshold: u32,

    /// How long an open circuit quarantines the path, in seconds.
    pub quarantine_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            direct_blacklist_secs: 30,
            relay_blacklist_secs: 120,
            circuit_threshold: 3,
            quarantine_secs: 600,
        }
    }
}

/// Timeout configuration for attempts and probes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Budget for a direct attempt in milliseconds.
    pub direct_ms: u64,

    /// Budget for a relay attempt in milliseconds.
    pub relay_ms: u64,

    /// Budget for a probe in milliseconds.
    pub probe_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            direct_ms: 12_000,
            relay_ms: 8_000,
            probe_ms: 4_000,
        }
    }
}

/// Routing loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Maximum attempts per `route()` call.
    pub max_attempts: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Background prober configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProberConfig {
    /// Run the prober alongside the router.
    pub enabled: bool,

    /// Seconds between probe passes.
    pub interval_secs: u64,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}

/// Health state persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file for durable state. In-memory only when unset.
    pub state_path: Option<String>,
}

/// Private relay server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Bind address (e.g., "0.0.0.0:8787").
    pub bind_address: String,

    /// Fixed upstream every request is forwarded to.
    pub target_url: Option<String>,

    /// Accept a percent-encoded `?target=` query parameter when no fixed target is set.
    pub allow_any_target: bool,

    /// Allowed request origins. Empty allows everything, `*` allows any browser origin.
    pub allowed_origins: Vec<String>,

    /// Header injected upstream with the secret token (e.g. "Authorization").
    pub upstream_auth_header: Option<String>,

    /// Environment variable holding the secret token.
    pub upstream_auth_token_env: String,

    /// Upstream request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8787".to_string(),
            target_url: None,
            allow_any_target: false,
            allowed_origins: Vec::new(),
            upstream_auth_header: None,
            upstream_auth_token_env: "UPSTREAM_AUTH_TOKEN".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
            tls: None,
        }
    }
}

/// TLS configuration for the relay listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: RouterConfig = toml::from_str("").unwrap();
        assert_eq!(config.health.circuit_threshold, 3);
        assert_eq!(config.routing.max_attempts, 3);
        assert_eq!(config.paths.public_relays.len(), 2);
        assert!(config.storage.state_path.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config: RouterConfig = toml::from_str(
            r#"
            [health]
            quarantine_secs = 60

            [paths.private_relay]
            endpoint = "https://relay.example.com/"

            [[paths.public_relays]]
            name = "only"
            prefix = "https://relay.example.net/?url="
            encoding = "encoded"
            "#,
        )
        .unwrap();

        assert_eq!(config.health.quarantine_secs, 60);
        assert_eq!(config.health.relay_blacklist_secs, 120);
        assert_eq!(config.paths.private_relay.endpoint, "https://relay.example.com/");
        assert_eq!(config.paths.public_relays.len(), 1);
        assert_eq!(config.paths.public_relays[0].encoding, TargetEncoding::Encoded);
    }
}
