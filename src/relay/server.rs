//! Private relay HTTP server.
//!
//! # Responsibilities
//! - Answer CORS preflights for allowed origins
//! - Resolve the upstream (fixed target, or `?target=` when enabled)
//! - Forward the request minus hop-by-hop headers, injecting the secret header
//! - Return the upstream response with CORS headers, or a 502 JSON error
//!
//! # Design Decisions
//! - Settings live behind `ArcSwap` so config reloads apply without restart
//! - Upstream bodies are buffered; the relay carries small API payloads
//! - Error messages never carry the upstream URL

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use url::Url;

use crate::config::RelayConfig;
use crate::observability::metrics;
use crate::relay::request_id::{MakeRequestUuid, X_REQUEST_ID};
use crate::security::{is_hop_by_hop, OriginPolicy};

const ALLOW_METHODS: &str = "GET,POST,OPTIONS";
const DEFAULT_ALLOW_HEADERS: &str = "Content-Type, Authorization";
const FORCED_ACCEPT: &str = "application/json, text/plain, */*";
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Live relay behaviour, rebuilt on every config reload.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    policy: OriginPolicy,
    target: Option<Url>,
    allow_any_target: bool,
    auth: Option<(HeaderName, HeaderValue)>,
}

impl RelaySettings {
    /// Build from config, reading the secret token from the configured env var.
    pub fn from_config(config: &RelayConfig) -> Self {
        let token = std::env::var(&config.upstream_auth_token_env).ok();
        Self::new(config, token)
    }

    pub fn new(config: &RelayConfig, token: Option<String>) -> Self {
        let auth = match (config.upstream_auth_header.as_deref(), token) {
            (Some(name), Some(token)) if !token.is_empty() => {
                let name = HeaderName::from_bytes(name.trim().as_bytes()).ok();
                let value = HeaderValue::from_str(&token).ok();
                if name.is_none() || value.is_none() {
                    tracing::warn!("Upstream auth header or token is not a valid header, not injecting");
                }
                name.zip(value)
            }
            (Some(_), _) => {
                tracing::warn!(
                    env = %config.upstream_auth_token_env,
                    "Upstream auth header configured but token is not set"
                );
                None
            }
            (None, _) => None,
        };

        Self {
            policy: OriginPolicy::from_list(&config.allowed_origins),
            target: config.target_url.as_deref().and_then(|t| Url::parse(t).ok()),
            allow_any_target: config.allow_any_target,
            auth,
        }
    }

    fn allow_origin(&self, origin: Option<&str>) -> HeaderValue {
        HeaderValue::from_str(&self.policy.allow_origin_value(origin))
            .unwrap_or(HeaderValue::from_static("*"))
    }

    /// Where this request goes. A fixed target always wins.
    fn upstream(&self, query: Option<&str>) -> Result<Url, Response> {
        if let Some(target) = &self.target {
            return Ok(target.clone());
        }
        if self.allow_any_target {
            let requested = query.and_then(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .find(|(key, _)| key == "target")
                    .map(|(_, value)| value.into_owned())
            });
            if let Some(requested) = requested {
                return Url::parse(&requested)
                    .ok()
                    .filter(|u| matches!(u.scheme(), "http" | "https"))
                    .ok_or_else(|| (StatusCode::BAD_REQUEST, "Invalid target").into_response());
            }
        }
        Err((StatusCode::INTERNAL_SERVER_ERROR, "No upstream target configured").into_response())
    }

    fn apply_cors(&self, origin: Option<&str>, headers: &mut HeaderMap) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin(origin));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(DEFAULT_ALLOW_HEADERS),
        );
    }
}

/// Application state injected into the handler.
#[derive(Clone)]
struct RelayState {
    settings: Arc<ArcSwap<RelaySettings>>,
    client: reqwest::Client,
}

/// HTTP server for the private relay.
pub struct RelayServer {
    app: Router,
    settings: Arc<ArcSwap<RelaySettings>>,
}

impl RelayServer {
    pub fn new(config: &RelayConfig) -> Result<Self, reqwest::Error> {
        Self::with_settings(config, RelaySettings::from_config(config))
    }

    pub fn with_settings(config: &RelayConfig, settings: RelaySettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("relay-router/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let settings = Arc::new(ArcSwap::from_pointee(settings));
        let state = RelayState {
            settings: settings.clone(),
            client,
        };

        Ok(Self {
            app: Self::build_router(config, state),
            settings,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: RelayState) -> Router {
        Router::new()
            .route("/", any(relay_handler))
            .route("/{*path}", any(relay_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(SetResponseHeaderLayer::if_not_present(
                        header::VARY,
                        HeaderValue::from_static("origin"),
                    ))
                    .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
            )
    }

    /// Live settings, shared with the running handler.
    ///
    /// Storing new settings applies them to the next request. Listener
    /// settings (bind address, TLS, limits) need a restart.
    pub fn settings(&self) -> Arc<ArcSwap<RelaySettings>> {
        self.settings.clone()
    }

    /// The router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Serve plain HTTP until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Relay server starting");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Relay server stopped");
        Ok(())
    }

    /// Serve HTTPS until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        tracing::info!(address = %addr, "Relay server starting (TLS)");

        let handle = axum_server::Handle::new();
        let signal = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            signal.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.app.into_make_service())
            .await?;

        tracing::info!("Relay server stopped");
        Ok(())
    }
}

async fn relay_handler(State(state): State<RelayState>, request: Request) -> Response {
    let start = Instant::now();
    let settings = state.settings.load_full();
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let response = relay(&state.client, &settings, origin.as_deref(), request).await;
    metrics::record_relay_request(response.status().as_u16(), start);
    response
}

async fn relay(
    client: &reqwest::Client,
    settings: &RelaySettings,
    origin: Option<&str>,
    request: Request,
) -> Response {
    if !settings.policy.allows(origin) {
        tracing::warn!(origin = ?origin, "Origin not allowed");
        return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
    }

    if request.method() == Method::OPTIONS {
        return preflight(settings, origin, request.headers());
    }

    let upstream = match settings.upstream(request.uri().query()) {
        Ok(url) => url,
        Err(response) => return response,
    };

    let (parts, body) = request.into_parts();

    let mut headers = HeaderMap::new();
    for (name, value) in &parts.headers {
        if is_hop_by_hop(name.as_str())
            || name == header::HOST
            || name == header::ORIGIN
            || name == header::CONTENT_LENGTH
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers.insert(header::ACCEPT, HeaderValue::from_static(FORCED_ACCEPT));
    if let Some((name, value)) = &settings.auth {
        headers.insert(name.clone(), value.clone());
    }

    let mut builder = client.request(parts.method.clone(), upstream).headers(headers);
    if parts.method != Method::GET && parts.method != Method::HEAD {
        match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => builder = builder.body(bytes),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read request body");
                return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
            }
        }
    }

    let upstream_response = match builder.send().await {
        Ok(response) => response,
        Err(e) => return proxy_error(settings, origin, e),
    };

    let status = upstream_response.status();
    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream_response.headers() {
        if is_hop_by_hop(name.as_str()) || name == header::CONTENT_LENGTH {
            continue;
        }
        response_headers.append(name.clone(), value.clone());
    }

    let bytes = match upstream_response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return proxy_error(settings, origin, e),
    };

    tracing::debug!(status = status.as_u16(), bytes = bytes.len(), "Relayed upstream response");

    settings.apply_cors(origin, &mut response_headers);
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response
}

fn preflight(settings: &RelaySettings, origin: Option<&str>, headers: &HeaderMap) -> Response {
    let requested = headers
        .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned()
        .unwrap_or(HeaderValue::from_static(DEFAULT_ALLOW_HEADERS));

    let mut response = StatusCode::NO_CONTENT.into_response();
    let out = response.headers_mut();
    out.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, settings.allow_origin(origin));
    out.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    out.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested);
    out.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(PREFLIGHT_MAX_AGE),
    );
    response
}

fn proxy_error(settings: &RelaySettings, origin: Option<&str>, error: reqwest::Error) -> Response {
    let message = error.without_url().to_string();
    tracing::error!(error = %message, "Upstream request failed");

    let mut response = (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "error": "proxy_error", "message": message })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, settings.allow_origin(origin));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(configure: impl FnOnce(&mut RelayConfig)) -> RelayConfig {
        let mut config = RelayConfig::default();
        configure(&mut config);
        config
    }

    #[test]
    fn test_fixed_target_wins_over_query() {
        let settings = RelaySettings::new(
            &config(|c| {
                c.target_url = Some("https://api.example.com/frontend".into());
                c.allow_any_target = true;
            }),
            None,
        );
        let url = settings.upstream(Some("target=https%3A%2F%2Fother.example%2F")).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/frontend");
    }

    #[test]
    fn test_query_target_when_allowed() {
        let settings = RelaySettings::new(&config(|c| c.allow_any_target = true), None);

        let url = settings
            .upstream(Some("x=1&target=https%3A%2F%2Fapi.example.com%2Fv1%3Fa%3Db"))
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1?a=b");

        let bad = settings.upstream(Some("target=not%20a%20url")).unwrap_err();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let missing = settings.upstream(None).unwrap_err();
        assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_query_target_ignored_when_disabled() {
        let settings = RelaySettings::new(&RelayConfig::default(), None);
        let err = settings
            .upstream(Some("target=https%3A%2F%2Fapi.example.com%2F"))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_auth_requires_header_and_token() {
        let with_header = config(|c| c.upstream_auth_header = Some("X-Api-Key".into()));

        assert!(RelaySettings::new(&with_header, None).auth.is_none());
        assert!(RelaySettings::new(&with_header, Some(String::new())).auth.is_none());

        let (name, value) = RelaySettings::new(&with_header, Some("s3cret".into()))
            .auth
            .unwrap();
        assert_eq!(name.as_str(), "x-api-key");
        assert_eq!(value, "s3cret");
    }

    #[test]
    fn test_preflight_echoes_requested_headers() {
        let settings = RelaySettings::new(
            &config(|c| c.allowed_origins = vec!["https://site.example".into()]),
            None,
        );
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCESS_CONTROL_REQUEST_HEADERS,
            HeaderValue::from_static("x-custom"),
        );

        let response = preflight(&settings, Some("https://site.example"), &headers);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let h = response.headers();
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://site.example");
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_HEADERS], "x-custom");
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_METHODS], ALLOW_METHODS);
        assert_eq!(h[header::ACCESS_CONTROL_MAX_AGE], "86400");
    }
}
