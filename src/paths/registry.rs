//! Ordered path list with a runtime-mutable private relay endpoint.
//!
//! # Responsibilities
//! - Build the priority-ordered path list from configuration
//! - Apply the persisted private relay override at construction
//! - Replace the private relay endpoint at runtime (and persist it)
//!
//! # Override Rule
//! A runtime override is stored together with the configured endpoint it
//! replaced. On (re)load it wins only while the config still holds that
//! endpoint; an edited endpoint in the config discards the override.

use std::sync::Arc;

use arc_swap::ArcSwap;
use url::Url;

use crate::config::PathsConfig;
use crate::paths::path::{Trust, TransportPath};
use crate::storage::KeyValueStore;

/// Storage key of the private relay endpoint override.
pub const PRIVATE_RELAY_OVERRIDE_KEY: &str = "relay_router.private_relay_endpoint";

/// Storage key of the configured endpoint an override was made against.
pub const PRIVATE_RELAY_BASELINE_KEY: &str = "relay_router.private_relay_config_endpoint";

/// Parse a relay endpoint, rejecting empty and template values.
pub fn parse_endpoint(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.contains(['<', '>', '{', '}']) {
        return None;
    }
    Url::parse(raw)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}

/// Registry of configured transport paths.
#[derive(Debug)]
pub struct PathRegistry {
    paths: ArcSwap<Vec<TransportPath>>,
    /// Trimmed private relay endpoint from the last loaded config.
    configured: ArcSwap<String>,
    overrides: Arc<dyn KeyValueStore>,
}

impl PathRegistry {
    /// Build the registry, applying a persisted override that still matches the config.
    pub fn new(config: &PathsConfig, overrides: Arc<dyn KeyValueStore>) -> Self {
        let registry = Self {
            paths: ArcSwap::from_pointee(Vec::new()),
            configured: ArcSwap::from_pointee(String::new()),
            overrides,
        };
        registry.reload(config);
        registry
    }

    /// Rebuild the list from a (re)loaded config.
    ///
    /// A persisted override survives only if the configured endpoint is the
    /// one it was made against.
    pub fn reload(&self, config: &PathsConfig) {
        let configured = config.private_relay.endpoint.trim().to_string();
        let private = match self.stored_override() {
            Some(url) if self.stored_baseline().as_deref() == Some(configured.as_str()) => Some(url),
            Some(url) => {
                tracing::info!(
                    dropped = %url,
                    "Configured private relay endpoint changed, discarding runtime override"
                );
                self.clear_override();
                parse_endpoint(&configured)
            }
            None => parse_endpoint(&configured),
        };
        self.configured.store(Arc::new(configured));

        let mut paths = Vec::with_capacity(config.public_relays.len() + 2);
        paths.push(TransportPath::direct());
        paths.push(TransportPath::private_relay(private.clone()));
        for relay in &config.public_relays {
            paths.push(TransportPath::public_relay(
                relay.name.clone(),
                relay.prefix.clone(),
                relay.encoding,
            ));
        }

        tracing::info!(
            paths = paths.len(),
            private_relay_configured = private.is_some(),
            "Path registry loaded"
        );
        self.paths.store(Arc::new(paths));
    }

    /// Snapshot of all paths in priority order.
    pub fn paths(&self) -> Arc<Vec<TransportPath>> {
        self.paths.load_full()
    }

    /// Look up a path by name.
    pub fn get(&self, name: &str) -> Option<TransportPath> {
        self.paths.load().iter().find(|p| p.name() == name).cloned()
    }

    /// Trust of a named path; unknown names are treated as public.
    pub fn trust_of(&self, name: &str) -> Trust {
        self.get(name).map(|p| p.trust()).unwrap_or(Trust::Public)
    }

    /// Current private relay endpoint, if configured.
    pub fn private_endpoint(&self) -> Option<Url> {
        self.paths
            .load()
            .iter()
            .find(|p| p.trust() == Trust::Private)
            .and_then(|p| p.probe_url())
            .and_then(|u| Url::parse(&u).ok())
    }

    /// Replace the private relay endpoint at runtime.
    ///
    /// `None` (or a placeholder) disables the path and clears the override.
    /// Persistence is best-effort; the in-memory change always applies.
    /// Returns the endpoint now in effect.
    pub fn set_private_endpoint(&self, endpoint: Option<&str>) -> Option<Url> {
        let parsed = endpoint.and_then(parse_endpoint);

        match &parsed {
            Some(url) => {
                let configured = self.configured.load();
                let persisted = self.overrides.set_many(&[
                    (PRIVATE_RELAY_OVERRIDE_KEY, url.as_str()),
                    (PRIVATE_RELAY_BASELINE_KEY, configured.as_str()),
                ]);
                if let Err(e) = persisted {
                    tracing::warn!(error = %e, "Failed to persist private relay override");
                }
            }
            None => self.clear_override(),
        }

        self.paths.rcu(|current| {
            current
                .iter()
                .map(|p| match p.trust() {
                    Trust::Private => TransportPath::private_relay(parsed.clone()),
                    _ => p.clone(),
                })
                .collect::<Vec<_>>()
        });

        tracing::info!(configured = parsed.is_some(), "Private relay endpoint updated");
        parsed
    }

    fn stored_override(&self) -> Option<Url> {
        self.read(PRIVATE_RELAY_OVERRIDE_KEY)
            .as_deref()
            .and_then(parse_endpoint)
    }

    fn stored_baseline(&self) -> Option<String> {
        self.read(PRIVATE_RELAY_BASELINE_KEY)
    }

    fn read(&self, key: &str) -> Option<String> {
        self.overrides.get(key).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Failed to read private relay override");
            None
        })
    }

    fn clear_override(&self) {
        for key in [PRIVATE_RELAY_OVERRIDE_KEY, PRIVATE_RELAY_BASELINE_KEY] {
            if let Err(e) = self.overrides.remove(key) {
                tracing::warn!(key, error = %e, "Failed to clear private relay override");
            }
        }
    }
}
