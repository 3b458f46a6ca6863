//! Timeout enforcement.
//!
//! # Responsibilities
//! - Pick the attempt budget for a path from its trust level
//! - Provide the probe budget
//!
//! # Design Decisions
//! - Direct attempts get the longer budget; relays add their own latency and
//!   a slow relay is abandoned in favour of the next candidate
//! - Timeout errors are distinct from other transport errors

use std::time::Duration;

use crate::config::TimeoutConfig;
use crate::paths::Trust;

impl TimeoutConfig {
    /// Attempt budget for a path of the given trust.
    pub fn for_trust(&self, trust: Trust) -> Duration {
        match trust {
            Trust::Direct => Duration::from_millis(self.direct_ms),
            Trust::Private | Trust::Public => Duration::from_millis(self.relay_ms),
        }
    }

    /// Budget for a single probe.
    pub fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }
}
