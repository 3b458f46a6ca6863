//! Path health state store.
//!
//! # State
//! - Blacklist (durable): short TTL penalty after any failure
//! - Circuits (durable): quarantine after consecutive failures
//! - Sticky path (session): last path that succeeded in this process
//! - Metrics (durable): advisory attempt/success/duration counters
//!
//! # Failure Policy
//! Every operation is best-effort over the injected [`KeyValueStore`]:
//! - unreadable or corrupt values read as empty state
//! - failed writes are logged and otherwise ignored
//!
//! Nothing here returns an error; routing degrades to "no memory of
//! history" instead of failing.
//!
//! Each public operation stages its durable writes in a [`Pending`] batch
//! and commits them with one [`KeyValueStore::set_many`] call.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::HealthConfig;
use crate::health::blacklist::Blacklist;
use crate::health::clock::Clock;
use crate::observability::metrics;
use crate::paths::{PathRegistry, TransportPath, Trust};
use crate::resilience::{CircuitPolicy, CircuitState, CircuitTable};
use crate::storage::KeyValueStore;

const BLACKLIST_KEY: &str = "relay_router.blacklist";
const CIRCUITS_KEY: &str = "relay_router.circuits";
const METRICS_KEY: &str = "relay_router.metrics";
const STICKY_KEY: &str = "relay_router.sticky";

/// Advisory per-path counters. Never used for routing decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMetrics {
    pub attempts: u64,
    pub successes: u64,
    pub total_duration_ms: u64,
}

/// Point-in-time view of the store for diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub sticky: Option<String>,
    pub blacklist: BTreeMap<String, u64>,
    pub circuits: BTreeMap<String, CircuitState>,
    pub metrics: BTreeMap<String, PathMetrics>,
}

/// Durable writes staged during one update. Later writes to a key replace
/// earlier ones.
#[derive(Debug, Default)]
struct Pending(Vec<(&'static str, String)>);

impl Pending {
    fn stage<T: Serialize>(&mut self, key: &'static str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => {
                self.0.retain(|(k, _)| *k != key);
                self.0.push((key, raw));
            }
            Err(e) => tracing::warn!(key, error = %e, "Failed to encode health state"),
        }
    }
}

/// Owner of all routing history.
#[derive(Debug)]
pub struct HealthStore {
    registry: Arc<PathRegistry>,
    durable: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: HealthConfig,
    /// Serializes read-modify-write cycles on the persisted maps.
    update_lock: Mutex<()>,
}

impl HealthStore {
    pub fn new(
        registry: Arc<PathRegistry>,
        durable: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: HealthConfig,
    ) -> Self {
        Self {
            registry,
            durable,
            session,
            clock,
            config,
            update_lock: Mutex::new(()),
        }
    }

    /// False iff the path is blacklisted or quarantined. Purges expired entries.
    pub fn is_usable(&self, name: &str) -> bool {
        let _guard = self.lock();
        let mut pending = Pending::default();
        let (blacklist, circuits) = self.load_penalties(&mut pending);
        self.commit(pending);
        let now = self.clock.now_ms();
        !(blacklist.contains(name, now) || circuits.is_open(name, now))
    }

    /// Inverse of [`is_usable`](Self::is_usable), used by the prober.
    pub fn is_penalized(&self, name: &str) -> bool {
        !self.is_usable(name)
    }

    /// Penalize a path after a failed attempt.
    ///
    /// Blacklists it with a trust-dependent TTL and feeds its circuit breaker.
    pub fn record_failure(&self, name: &str, elapsed: Duration) {
        let trust = self.registry.trust_of(name);
        let ttl = self.blacklist_ttl(trust);
        let policy = self.circuit_policy();

        let _guard = self.lock();
        let now = self.clock.now_ms();
        let mut pending = Pending::default();
        let (mut blacklist, mut circuits) = self.load_penalties(&mut pending);

        blacklist.insert(name, now + ttl.as_millis() as u64);
        if circuits.record_failure(name, now, &policy) {
            tracing::warn!(
                path = %name,
                quarantine_secs = policy.quarantine.as_secs(),
                "Circuit opened, path quarantined"
            );
            metrics::record_circuit_opened(name);
        }

        pending.stage(BLACKLIST_KEY, &blacklist);
        pending.stage(CIRCUITS_KEY, &circuits);
        self.bump_metrics(name, elapsed, false, &mut pending);
        self.commit(pending);
        metrics::record_path_usable(name, false);

        tracing::debug!(path = %name, ttl_secs = ttl.as_secs(), "Path blacklisted");
    }

    /// Clear a path's penalties after a successful attempt and make it sticky.
    pub fn record_success(&self, name: &str, elapsed: Duration) {
        let _guard = self.lock();
        let mut pending = Pending::default();
        self.clear_penalties_locked(name, &mut pending);
        self.bump_metrics(name, elapsed, true, &mut pending);
        self.commit(pending);

        if let Err(e) = self.session.set(STICKY_KEY, name) {
            tracing::warn!(error = %e, "Failed to store sticky path");
        }
    }

    /// Clear blacklist and circuit state (e.g. after a successful probe).
    /// Returns whether any penalty was removed.
    pub fn clear_penalties(&self, name: &str) -> bool {
        let _guard = self.lock();
        let mut pending = Pending::default();
        let cleared = self.clear_penalties_locked(name, &mut pending);
        self.commit(pending);
        cleared
    }

    /// Usable paths in routing order: sticky first, then registry order.
    pub fn ordered_candidates(&self) -> Vec<TransportPath> {
        let paths = self.registry.paths();
        let sticky = self.sticky();

        let _guard = self.lock();
        let mut pending = Pending::default();
        let (blacklist, circuits) = self.load_penalties(&mut pending);
        self.commit(pending);
        let now = self.clock.now_ms();
        let usable = |p: &TransportPath| {
            !(blacklist.contains(p.name(), now) || circuits.is_open(p.name(), now))
        };

        let sticky_path = sticky
            .as_deref()
            .and_then(|name| paths.iter().find(|p| p.name() == name))
            .filter(|p| usable(p));

        let mut ordered = Vec::with_capacity(paths.len());
        if let Some(path) = sticky_path {
            ordered.push(path.clone());
        }
        ordered.extend(
            paths
                .iter()
                .filter(|p| Some(p.name()) != sticky_path.map(|s| s.name()))
                .filter(|p| usable(p))
                .cloned(),
        );
        ordered
    }

    /// Sticky path of the current session.
    pub fn sticky(&self) -> Option<String> {
        match self.session.get(STICKY_KEY) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read sticky path");
                None
            }
        }
    }

    /// Live blacklist entries (expired ones purged).
    pub fn blacklist(&self) -> BTreeMap<String, u64> {
        let _guard = self.lock();
        let mut pending = Pending::default();
        let (blacklist, _) = self.load_penalties(&mut pending);
        self.commit(pending);
        blacklist.entries()
    }

    /// Live circuit states (elapsed quarantines closed).
    pub fn circuits(&self) -> BTreeMap<String, CircuitState> {
        let _guard = self.lock();
        let mut pending = Pending::default();
        let (_, circuits) = self.load_penalties(&mut pending);
        self.commit(pending);
        circuits.entries()
    }

    /// Accumulated per-path metrics.
    pub fn metrics(&self) -> BTreeMap<String, PathMetrics> {
        self.load(METRICS_KEY)
    }

    /// Everything at once.
    pub fn snapshot(&self) -> Diagnostics {
        Diagnostics {
            sticky: self.sticky(),
            blacklist: self.blacklist(),
            circuits: self.circuits(),
            metrics: self.metrics(),
        }
    }

    fn blacklist_ttl(&self, trust: Trust) -> Duration {
        match trust {
            Trust::Direct => Duration::from_secs(self.config.direct_blacklist_secs),
            Trust::Private | Trust::Public => Duration::from_secs(self.config.relay_blacklist_secs),
        }
    }

    fn circuit_policy(&self) -> CircuitPolicy {
        CircuitPolicy {
            threshold: self.config.circuit_threshold,
            quarantine: Duration::from_secs(self.config.quarantine_secs),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.update_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Load both penalty maps, staging write-back of lazily purged entries.
    /// Caller must hold the update lock.
    fn load_penalties(&self, pending: &mut Pending) -> (Blacklist, CircuitTable) {
        let now = self.clock.now_ms();

        let mut blacklist: Blacklist = self.load(BLACKLIST_KEY);
        if blacklist.purge_expired(now) {
            pending.stage(BLACKLIST_KEY, &blacklist);
        }

        let mut circuits: CircuitTable = self.load(CIRCUITS_KEY);
        if circuits.purge_expired(now) {
            pending.stage(CIRCUITS_KEY, &circuits);
        }

        (blacklist, circuits)
    }

    fn clear_penalties_locked(&self, name: &str, pending: &mut Pending) -> bool {
        let (mut blacklist, mut circuits) = self.load_penalties(pending);

        let mut cleared = false;
        if blacklist.remove(name) {
            pending.stage(BLACKLIST_KEY, &blacklist);
            cleared = true;
        }
        if circuits.reset(name) {
            pending.stage(CIRCUITS_KEY, &circuits);
            cleared = true;
        }
        metrics::record_path_usable(name, true);
        cleared
    }

    fn bump_metrics(&self, name: &str, elapsed: Duration, success: bool, pending: &mut Pending) {
        let mut all: BTreeMap<String, PathMetrics> = self.load(METRICS_KEY);
        let entry = all.entry(name.to_string()).or_default();
        entry.attempts += 1;
        entry.total_duration_ms += elapsed.as_millis() as u64;
        if success {
            entry.successes += 1;
        }
        pending.stage(METRICS_KEY, &all);
    }

    fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = match self.durable.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                tracing::warn!(key, error = %e, "Health state unreadable, treating as empty");
                return T::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Health state corrupt, treating as empty");
            T::default()
        })
    }

    fn commit(&self, pending: Pending) {
        if pending.0.is_empty() {
            return;
        }
        let entries: Vec<(&str, &str)> = pending.0.iter().map(|(k, v)| (*k, v.as_str())).collect();
        if let Err(e) = self.durable.set_many(&entries) {
            tracing::warn!(keys = entries.len(), error = %e, "Failed to persist health state");
        }
    }
}
