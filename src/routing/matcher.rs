//! Local target detection.
//!
//! # Responsibilities
//! - Decide whether a target URL points at this machine
//!
//! # Design Decisions
//! - Host matching is case-insensitive (per HTTP spec)
//! - `localhost` and `*.localhost` count as local
//! - Any IPv4 loopback (127.0.0.0/8), `::1` and IPv4-mapped loopback count
//! - Unparsable URLs are not local; the direct attempt will fail on its own

use url::{Host, Url};

/// True when `target` is a loopback / localhost URL.
pub fn is_local_target(target: &str) -> bool {
    let Ok(url) = Url::parse(target) else {
        return false;
    };

    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => {
            ip.is_loopback() || ip.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback())
        }
        None => false,
    }
}
