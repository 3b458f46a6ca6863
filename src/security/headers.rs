//! Header filtering by trust level and hop.
//!
//! # Responsibilities
//! - Strip credentials before a request reaches an untrusted public relay
//! - Drop hop-by-hop headers when the relay server forwards a message
//!
//! # Design Decisions
//! - Header names compare case-insensitively (per HTTP spec)
//! - The caller's header map is never mutated; filtered copies are returned

use std::collections::BTreeMap;

use crate::paths::Trust;

/// Headers that must never reach a public relay.
pub const CREDENTIAL_HEADERS: &[&str] = &["authorization", "proxy-authorization"];

/// Connection-scoped headers a relay must not forward.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authorization",
    "proxy-authenticate",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

fn is_credential(name: &str) -> bool {
    CREDENTIAL_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// Headers to send on a path of the given trust.
pub fn headers_for_trust(headers: &BTreeMap<String, String>, trust: Trust) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| trust != Trust::Public || !is_credential(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Whether a `Content-Type` header is present, in any letter case.
pub fn has_content_type(headers: &[(String, String)]) -> bool {
    headers
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("content-type"))
}
