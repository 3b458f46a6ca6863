//! Origin allow-list for the private relay.
//!
//! # Policy
//! - No list configured: every request is allowed, with or without `Origin`
//! - `*` in the list: any request carrying an `Origin` is allowed
//! - Otherwise: `Origin` must match an entry exactly
//!
//! Unrestricted accepts requests without `Origin` because non-browser
//! callers, the router's own `HttpTransport` included, never send one.
//! Configuring a list opts the relay into browser-only access.

/// Parsed allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    Unrestricted,
    AnyOrigin,
    List(Vec<String>),
}

impl OriginPolicy {
    pub fn from_list(origins: &[String]) -> Self {
        let origins: Vec<String> = origins
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if origins.is_empty() {
            OriginPolicy::Unrestricted
        } else if origins.iter().any(|o| o == "*") {
            OriginPolicy::AnyOrigin
        } else {
            OriginPolicy::List(origins)
        }
    }

    pub fn allows(&self, origin: Option<&str>) -> bool {
        match (self, origin) {
            (OriginPolicy::Unrestricted, _) => true,
            (_, None) => false,
            (OriginPolicy::AnyOrigin, Some(_)) => true,
            (OriginPolicy::List(list), Some(origin)) => list.iter().any(|o| o == origin),
        }
    }

    /// Value for `Access-Control-Allow-Origin`.
    pub fn allow_origin_value(&self, origin: Option<&str>) -> String {
        match (self, origin) {
            (OriginPolicy::AnyOrigin, _) | (_, None) => "*".to_string(),
            (_, Some(origin)) => origin.to_string(),
        }
    }
}
