//! Transport path descriptors.
//!
//! # Responsibilities
//! - Name and trust level of one way to reach the target
//! - Derive the per-attempt call URL from the true target URL
//! - Provide the URL used for lightweight probes

use serde::{Deserialize, Serialize};
use url::Url;

/// Name of the always-present direct path.
pub const DIRECT_PATH: &str = "direct";

/// Name of the trusted relay path.
pub const PRIVATE_RELAY_PATH: &str = "private-relay";

/// Trust level of a path. Gates which headers may be forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trust {
    Direct,
    Private,
    Public,
}

impl Trust {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trust::Direct => "direct",
            Trust::Private => "private",
            Trust::Public => "public",
        }
    }
}

/// How a public relay embeds the target in its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetEncoding {
    /// Target appended verbatim (`https://relay/` + `https://api/...`).
    #[default]
    Suffix,
    /// Target percent-encoded, typically as a query value.
    Encoded,
}

/// Where requests for a path are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// The target URL itself.
    Direct,
    /// A fixed relay URL; `None` while unconfigured.
    Fixed(Option<Url>),
    /// A relay URL built from the target.
    Prefixed {
        prefix: String,
        encoding: TargetEncoding,
    },
}

/// One named way to reach the true target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportPath {
    name: String,
    trust: Trust,
    endpoint: Endpoint,
}

impl TransportPath {
    /// The direct path.
    pub fn direct() -> Self {
        Self {
            name: DIRECT_PATH.to_string(),
            trust: Trust::Direct,
            endpoint: Endpoint::Direct,
        }
    }

    /// The trusted relay path.
    pub fn private_relay(endpoint: Option<Url>) -> Self {
        Self {
            name: PRIVATE_RELAY_PATH.to_string(),
            trust: Trust::Private,
            endpoint: Endpoint::Fixed(endpoint),
        }
    }

    /// A third-party relay.
    pub fn public_relay(
        name: impl Into<String>,
        prefix: impl Into<String>,
        encoding: TargetEncoding,
    ) -> Self {
        Self {
            name: name.into(),
            trust: Trust::Public,
            endpoint: Endpoint::Prefixed {
                prefix: prefix.into(),
                encoding,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trust(&self) -> Trust {
        self.trust
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// True for every path that goes through an intermediary.
    pub fn is_relay(&self) -> bool {
        self.trust != Trust::Direct
    }

    /// False only for a fixed relay without an endpoint.
    pub fn is_configured(&self) -> bool {
        !matches!(self.endpoint, Endpoint::Fixed(None))
    }

    /// URL to call for one attempt at `target`. `None` when unconfigured.
    pub fn call_url(&self, target: &str) -> Option<String> {
        match &self.endpoint {
            Endpoint::Direct => Some(target.to_string()),
            Endpoint::Fixed(url) => url.as_ref().map(Url::to_string),
            Endpoint::Prefixed { prefix, encoding } => Some(match encoding {
                TargetEncoding::Suffix => format!("{prefix}{target}"),
                TargetEncoding::Encoded => {
                    let encoded: String =
                        url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
                    format!("{prefix}{encoded}")
                }
            }),
        }
    }

    /// URL for a zero-body probe. Direct paths are never probed.
    pub fn probe_url(&self) -> Option<String> {
        match &self.endpoint {
            Endpoint::Direct => None,
            Endpoint::Fixed(url) => url.as_ref().map(Url::to_string),
            Endpoint::Prefixed { prefix, .. } => Some(prefix.clone()),
        }
    }
}
