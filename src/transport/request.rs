//! Caller-supplied request.
//!
//! # Design Decisions
//! - The request is never mutated; each attempt derives its own URL and headers
//! - Header names are kept as given; trust filtering is case-insensitive

use std::collections::BTreeMap;

use serde_json::Value;

/// Request body: a structured value sent as JSON, or raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
}

impl RequestBody {
    /// Serialized bytes and whether the payload is JSON.
    pub fn encode(&self) -> (String, bool) {
        match self {
            RequestBody::Json(value) => (value.to_string(), true),
            RequestBody::Text(text) => (text.clone(), false),
        }
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

/// One logical request to the true target.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub target_url: String,
    pub headers: BTreeMap<String, String>,
    pub body: RequestBody,
}

impl RouteRequest {
    pub fn new(target_url: impl Into<String>, body: impl Into<RequestBody>) -> Self {
        Self {
            target_url: target_url.into(),
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}
