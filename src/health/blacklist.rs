//! Short-TTL penalties applied after a single failure.
//!
//! # State
//! `path name → expiry (ms since epoch)`; a path is blacklisted while
//! `now <= expiry`.
//!
//! # Design Decisions
//! - Expired entries are purged lazily, on read
//! - A newer failure always replaces the previous expiry

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Blacklist entries keyed by path name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blacklist(BTreeMap<String, u64>);

impl Blacklist {
    /// Blacklist `name` until `expiry_ms`.
    pub fn insert(&mut self, name: &str, expiry_ms: u64) {
        self.0.insert(name.to_string(), expiry_ms);
    }

    /// Remove an entry. Returns whether one existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.0.remove(name).is_some()
    }

    /// Whether `name` is blacklisted at `now_ms`, without purging.
    pub fn contains(&self, name: &str, now_ms: u64) -> bool {
        self.0.get(name).is_some_and(|&expiry| now_ms <= expiry)
    }

    /// Drop every expired entry. Returns whether anything changed.
    pub fn purge_expired(&mut self, now_ms: u64) -> bool {
        let before = self.0.len();
        self.0.retain(|_, expiry| now_ms <= *expiry);
        self.0.len() != before
    }

    pub fn expiry(&self, name: &str) -> Option<u64> {
        self.0.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy of the raw entries.
    pub fn entries(&self) -> BTreeMap<String, u64> {
        self.0.clone()
    }
}
