//! Circuit breaker for transport paths.
//!
//! # States
//! - Closed: path usable, consecutive failures counted
//! - Open: path quarantined until `quarantine_until`
//!
//! # State Transitions
//! ```text
//! Closed → Open: fail_count reaches threshold (fail_count resets to 0)
//! Open → Closed: quarantine elapses, or any success / successful probe
//! ```
//!
//! # Design Decisions
//! - Per-path circuit (not global)
//! - Independent of the blacklist: a path can be in both
//! - No half-open state; the background prober plays that role

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Threshold and quarantine length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitPolicy {
    pub threshold: u32,
    pub quarantine: Duration,
}

/// Circuit state of one path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitState {
    /// Consecutive failures since the last success or circuit opening.
    pub fail_count: u32,
    /// Quarantine end (ms since epoch) while the circuit is open.
    pub quarantine_until: Option<u64>,
}

impl CircuitState {
    /// True while the quarantine window covers `now_ms`.
    pub fn is_open(&self, now_ms: u64) -> bool {
        self.quarantine_until.is_some_and(|until| now_ms <= until)
    }

    /// Count a failure. Returns true if this failure opened the circuit.
    pub fn record_failure(&mut self, now_ms: u64, policy: &CircuitPolicy) -> bool {
        self.fail_count += 1;
        if self.fail_count >= policy.threshold {
            self.fail_count = 0;
            self.quarantine_until = Some(now_ms + policy.quarantine.as_millis() as u64);
            return true;
        }
        false
    }

    /// Close an elapsed quarantine. Returns whether anything changed.
    fn expire(&mut self, now_ms: u64) -> bool {
        match self.quarantine_until {
            Some(until) if now_ms > until => {
                self.quarantine_until = None;
                true
            }
            _ => false,
        }
    }

    fn is_idle(&self) -> bool {
        self.fail_count == 0 && self.quarantine_until.is_none()
    }
}

/// Circuit states keyed by path name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CircuitTable(BTreeMap<String, CircuitState>);

impl CircuitTable {
    pub fn is_open(&self, name: &str, now_ms: u64) -> bool {
        self.0.get(name).is_some_and(|s| s.is_open(now_ms))
    }

    /// Count a failure for `name`. Returns true if the circuit opened.
    pub fn record_failure(&mut self, name: &str, now_ms: u64, policy: &CircuitPolicy) -> bool {
        self.0
            .entry(name.to_string())
            .or_default()
            .record_failure(now_ms, policy)
    }

    /// Forget a path's circuit. Returns whether one existed.
    pub fn reset(&mut self, name: &str) -> bool {
        self.0.remove(name).is_some()
    }

    /// Close elapsed quarantines and drop idle entries. Returns whether anything changed.
    pub fn purge_expired(&mut self, now_ms: u64) -> bool {
        let mut changed = false;
        for state in self.0.values_mut() {
            changed |= state.expire(now_ms);
        }
        let before = self.0.len();
        self.0.retain(|_, s| !s.is_idle());
        changed || self.0.len() != before
    }

    pub fn get(&self, name: &str) -> Option<CircuitState> {
        self.0.get(name).copied()
    }

    pub fn entries(&self) -> BTreeMap<String, CircuitState> {
        self.0.clone()
    }
}
