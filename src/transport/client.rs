//! HTTP transport: one bounded-time exchange on one path.
//!
//! # Responsibilities
//! - Build the call URL and header set for the path
//! - POST the body with a hard deadline
//! - Parse the response tolerantly and classify it
//! - Report elapsed time for every outcome
//!
//! # Design Decisions
//! - The deadline covers the whole exchange, body included
//! - Error messages never carry the call URL (relay URLs stay internal)
//! - No health bookkeeping here; that is the router's job

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};

use crate::paths::TransportPath;
use crate::security::{has_content_type, headers_for_trust};
use crate::transport::request::RouteRequest;
use crate::transport::response::ResponseBody;

/// Why one attempt failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("no response within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("upstream returned HTTP {status}")]
    Http { status: u16, body: ResponseBody },

    #[error("network error: {0}")]
    Network(String),

    #[error("path `{0}` is not configured")]
    Configuration(String),
}

impl TransportError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout { .. } => "timeout",
            TransportError::Http { .. } => "http_error",
            TransportError::Network(_) => "network_error",
            TransportError::Configuration(_) => "configuration_error",
        }
    }

    /// HTTP status, when a server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed error payload, when a server answered.
    pub fn body(&self) -> Option<&ResponseBody> {
        match self {
            TransportError::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Outcome of one attempt plus how long it took.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub result: Result<ResponseBody, TransportError>,
    pub elapsed: Duration,
}

/// One exchange on one path. Implemented over HTTP by [`HttpTransport`].
pub trait Transport: Clone + Send + Sync + 'static {
    /// POST `request` over `path` within `timeout`.
    fn attempt(
        &self,
        path: &TransportPath,
        request: &RouteRequest,
        timeout: Duration,
    ) -> impl Future<Output = Attempt> + Send;

    /// Zero-body `OPTIONS` to `url`; the response status on any answer.
    fn probe(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<u16, TransportError>> + Send;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("relay-router/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn exchange(
        &self,
        path: &TransportPath,
        request: &RouteRequest,
        timeout: Duration,
    ) -> Result<ResponseBody, TransportError> {
        let url = path
            .call_url(&request.target_url)
            .ok_or_else(|| TransportError::Configuration(path.name().to_string()))?;

        let headers = headers_for_trust(&request.headers, path.trust());
        let (payload, is_json) = request.body.encode();

        let mut builder = self.client.post(url);
        if is_json && !has_content_type(&headers) {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let builder = builder.body(payload);

        let exchange = async move {
            let response = builder.send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        };

        let (status, text) = match tokio::time::timeout(timeout, exchange).await {
            Err(_) => {
                return Err(TransportError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Ok(Err(e)) => return Err(TransportError::Network(e.without_url().to_string())),
            Ok(Ok(pair)) => pair,
        };

        let body = ResponseBody::parse(text);
        if status.is_success() {
            Ok(body)
        } else {
            Err(TransportError::Http {
                status: status.as_u16(),
                body,
            })
        }
    }
}

impl Transport for HttpTransport {
    async fn attempt(
        &self,
        path: &TransportPath,
        request: &RouteRequest,
        timeout: Duration,
    ) -> Attempt {
        let start = Instant::now();
        let result = self.exchange(path, request, timeout).await;
        Attempt {
            result,
            elapsed: start.elapsed(),
        }
    }

    async fn probe(&self, url: &str, timeout: Duration) -> Result<u16, TransportError> {
        let request = self.client.request(Method::OPTIONS, url).send();
        match tokio::time::timeout(timeout, request).await {
            Err(_) => Err(TransportError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
            Ok(Err(e)) => Err(TransportError::Network(e.without_url().to_string())),
            Ok(Ok(response)) => Ok(response.status().as_u16()),
        }
    }
}
