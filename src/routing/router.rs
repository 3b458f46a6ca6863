//! Request routing across transport paths.
//!
//! # Responsibilities
//! - Order candidates via the health store
//! - Attempt them one by one, recording every outcome
//! - Return the first success or the last failure
//! - Expose diagnostics and a manual probe trigger
//!
//! # Design Decisions
//! - Transport errors never escape raw; they become health updates and, at
//!   the end, part of `RouteError`
//! - A local target's direct failure is returned unmasked
//! - Unconfigured relays are skipped without penalty or attempt count

use std::collections::BTreeMap;
use std::sync::Arc;

use url::Url;

use crate::config::{RouterConfig, TimeoutConfig};
use crate::health::{Diagnostics, HealthStore, PathMetrics, Prober};
use crate::observability::metrics;
use crate::paths::{PathRegistry, Trust};
use crate::resilience::CircuitState;
use crate::routing::matcher::is_local_target;
use crate::transport::{
    HttpTransport, ResponseBody, RouteRequest, Transport, TransportError,
};

/// Terminal routing failure.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// No usable candidate succeeded (or none was usable at all).
    #[error("all transport paths exhausted")]
    Exhausted { last_error: Option<TransportError> },

    /// The local target's direct attempt failed; relays were not tried.
    #[error("local target unreachable: {0}")]
    LocalTarget(#[source] TransportError),
}

impl RouteError {
    /// Underlying error of the last attempt, if any attempt was made.
    pub fn last_error(&self) -> Option<&TransportError> {
        match self {
            RouteError::Exhausted { last_error } => last_error.as_ref(),
            RouteError::LocalTarget(e) => Some(e),
        }
    }

    /// HTTP status of the last attempt, if a server answered.
    pub fn status(&self) -> Option<u16> {
        self.last_error().and_then(TransportError::status)
    }

    /// Parsed error payload of the last attempt, if a server answered.
    pub fn body(&self) -> Option<&ResponseBody> {
        self.last_error().and_then(TransportError::body)
    }
}

/// Adaptive multi-path request router.
pub struct Router<T: Transport = HttpTransport> {
    registry: Arc<PathRegistry>,
    health: Arc<HealthStore>,
    transport: T,
    timeouts: TimeoutConfig,
    max_attempts: usize,
    prober: Prober<T>,
}

impl<T: Transport> Router<T> {
    pub fn new(
        config: &RouterConfig,
        registry: Arc<PathRegistry>,
        health: Arc<HealthStore>,
        transport: T,
    ) -> Self {
        let prober = Prober::new(
            registry.clone(),
            health.clone(),
            transport.clone(),
            config,
        );
        Self {
            registry,
            health,
            transport,
            timeouts: config.timeouts.clone(),
            max_attempts: config.routing.max_attempts,
            prober,
        }
    }

    /// Send one request, falling back across paths.
    pub async fn route(&self, request: &RouteRequest) -> Result<ResponseBody, RouteError> {
        let local = is_local_target(&request.target_url);
        let candidates = self.health.ordered_candidates();

        tracing::debug!(
            target_url = %request.target_url,
            local,
            candidates = candidates.len(),
            "Routing request"
        );

        let mut attempts = 0;
        let mut last_error = None;

        for path in &candidates {
            if attempts >= self.max_attempts {
                tracing::debug!(max_attempts = self.max_attempts, "Attempt cap reached");
                break;
            }
            if local && path.is_relay() {
                continue;
            }
            if !path.is_configured() {
                tracing::debug!(path = %path.name(), "Skipping unconfigured path");
                continue;
            }

            attempts += 1;
            let timeout = self.timeouts.for_trust(path.trust());
            let attempt = self.transport.attempt(path, request, timeout).await;

            match attempt.result {
                Ok(body) => {
                    metrics::record_attempt(path.name(), "success", attempt.elapsed);
                    self.health.record_success(path.name(), attempt.elapsed);
                    tracing::info!(
                        path = %path.name(),
                        attempt = attempts,
                        elapsed_ms = attempt.elapsed.as_millis() as u64,
                        "Request succeeded"
                    );
                    return Ok(body);
                }
                Err(error) => {
                    metrics::record_attempt(path.name(), error.kind(), attempt.elapsed);
                    self.health.record_failure(path.name(), attempt.elapsed);
                    tracing::warn!(
                        path = %path.name(),
                        attempt = attempts,
                        kind = error.kind(),
                        status = ?error.status(),
                        elapsed_ms = attempt.elapsed.as_millis() as u64,
                        "Attempt failed"
                    );

                    if local && path.trust() == Trust::Direct {
                        return Err(RouteError::LocalTarget(error));
                    }
                    last_error = Some(error);
                }
            }
        }

        tracing::warn!(attempts, "All transport paths exhausted");
        Err(RouteError::Exhausted { last_error })
    }

    /// Run one probe pass now. Returns how many paths recovered.
    pub async fn probe_now(&self) -> usize {
        self.prober.probe_once().await
    }

    /// A prober sharing this router's state, for background scheduling.
    pub fn prober(&self) -> Prober<T> {
        self.prober.clone()
    }

    /// Replace the private relay endpoint (persisted best-effort).
    pub fn set_private_endpoint(&self, endpoint: Option<&str>) -> Option<Url> {
        self.registry.set_private_endpoint(endpoint)
    }

    pub fn registry(&self) -> &Arc<PathRegistry> {
        &self.registry
    }

    pub fn health(&self) -> &Arc<HealthStore> {
        &self.health
    }

    pub fn sticky(&self) -> Option<String> {
        self.health.sticky()
    }

    pub fn blacklist(&self) -> BTreeMap<String, u64> {
        self.health.blacklist()
    }

    pub fn circuits(&self) -> BTreeMap<String, CircuitState> {
        self.health.circuits()
    }

    pub fn metrics(&self) -> BTreeMap<String, PathMetrics> {
        self.health.metrics()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.health.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PublicRelayConfig;
    use crate::health::ManualClock;
    use crate::paths::{TargetEncoding, DIRECT_PATH, PRIVATE_RELAY_PATH};
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::transport::Attempt;

    type Outcome = Result<ResponseBody, TransportError>;

    /// Transport that answers from a script keyed by path name / probe URL.
    #[derive(Clone, Default)]
    struct ScriptedTransport {
        outcomes: Arc<Mutex<HashMap<String, Outcome>>>,
        probes: Arc<Mutex<HashMap<String, u16>>>,
        calls: Arc<Mutex<Vec<String>>>,
        probed: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedTransport {
        fn script(&self, path: &str, outcome: Outcome) {
            self.outcomes.lock().unwrap().insert(path.to_string(), outcome);
        }

        fn probe_status(&self, url: &str, status: u16) {
            self.probes.lock().unwrap().insert(url.to_string(), status);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn probed(&self) -> Vec<String> {
            self.probed.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        async fn attempt(
            &self,
            path: &crate::paths::TransportPath,
            _request: &RouteRequest,
            _timeout: Duration,
        ) -> Attempt {
            self.calls.lock().unwrap().push(path.name().to_string());
            let result = self
                .outcomes
                .lock()
                .unwrap()
                .get(path.name())
                .cloned()
                .unwrap_or_else(|| Err(TransportError::Network("unscripted".into())));
            Attempt {
                result,
                elapsed: Duration::from_millis(5),
            }
        }

        async fn probe(&self, url: &str, _timeout: Duration) -> Result<u16, TransportError> {
            self.probed.lock().unwrap().push(url.to_string());
            self.probes
                .lock()
                .unwrap()
                .get(url)
                .copied()
                .ok_or_else(|| TransportError::Network("unreachable".into()))
        }
    }

    struct Fixture {
        router: Router<ScriptedTransport>,
        transport: ScriptedTransport,
        clock: Arc<ManualClock>,
    }

    fn fixture(configure: impl FnOnce(&mut RouterConfig)) -> Fixture {
        let mut config = RouterConfig::default();
        config.paths.public_relays = vec![
            PublicRelayConfig {
                name: "relay-a".into(),
                prefix: "https://a.example/".into(),
                encoding: TargetEncoding::Suffix,
            },
            PublicRelayConfig {
                name: "relay-b".into(),
                prefix: "https://b.example/?url=".into(),
                encoding: TargetEncoding::Encoded,
            },
        ];
        configure(&mut config);

        let durable = Arc::new(MemoryStore::new());
        let registry = Arc::new(PathRegistry::new(&config.paths, durable.clone()));
        let clock = Arc::new(ManualClock::new(5_000_000));
        let health = Arc::new(HealthStore::new(
            registry.clone(),
            durable,
            Arc::new(MemoryStore::new()),
            clock.clone(),
            config.health.clone(),
        ));
        let transport = ScriptedTransport::default();
        let router = Router::new(&config, registry, health, transport.clone());

        Fixture {
            router,
            transport,
            clock,
        }
    }

    fn network() -> Outcome {
        Err(TransportError::Network("connection refused".into()))
    }

    const REMOTE: &str = "https://api.example.com/frontend?output=json";

    #[tokio::test]
    async fn test_falls_back_to_working_relay() {
        let f = fixture(|_| {});
        f.transport.script(DIRECT_PATH, network());
        f.transport.script("relay-a", network());
        f.transport
            .script("relay-b", Ok(ResponseBody::Json(json!({"ok": true}))));

        let body = f
            .router
            .route(&RouteRequest::new(REMOTE, json!({"q": 1})))
            .await
            .unwrap();

        assert_eq!(body, ResponseBody::Json(json!({"ok": true})));
        // The placeholder private relay is skipped without an attempt.
        assert_eq!(f.transport.calls(), vec![DIRECT_PATH, "relay-a", "relay-b"]);
        assert_eq!(f.router.sticky().as_deref(), Some("relay-b"));

        let blacklist = f.router.blacklist();
        assert_eq!(blacklist.len(), 2);
        assert!(blacklist.contains_key(DIRECT_PATH));
        assert!(blacklist.contains_key("relay-a"));
    }

    #[tokio::test]
    async fn test_sticky_path_is_tried_first() {
        let f = fixture(|_| {});
        f.transport.script(DIRECT_PATH, network());
        f.transport.script("relay-a", Ok(ResponseBody::Text("ok".into())));

        f.router.route(&RouteRequest::new(REMOTE, "x")).await.unwrap();
        // Let the direct blacklist lapse; relay-a must still come first.
        f.clock.advance_ms(31_000);
        f.router.route(&RouteRequest::new(REMOTE, "x")).await.unwrap();

        assert_eq!(f.transport.calls(), vec![DIRECT_PATH, "relay-a", "relay-a"]);
    }

    #[tokio::test]
    async fn test_all_blacklisted_fails_without_network() {
        let f = fixture(|_| {});
        for name in [DIRECT_PATH, PRIVATE_RELAY_PATH, "relay-a", "relay-b"] {
            f.router.health().record_failure(name, Duration::ZERO);
        }

        let err = f
            .router
            .route(&RouteRequest::new(REMOTE, "x"))
            .await
            .unwrap_err();

        assert!(matches!(err, RouteError::Exhausted { last_error: None }));
        assert!(f.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_local_target_never_uses_relays() {
        let f = fixture(|_| {});
        f.transport.script(
            DIRECT_PATH,
            Err(TransportError::Http {
                status: 500,
                body: ResponseBody::Json(json!({"error": "boom"})),
            }),
        );
        f.transport.script("relay-a", Ok(ResponseBody::Text("ok".into())));

        let err = f
            .router
            .route(&RouteRequest::new("http://127.0.0.1:667/api/very", "x"))
            .await
            .unwrap_err();

        assert!(matches!(err, RouteError::LocalTarget(_)));
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.body(), Some(&ResponseBody::Json(json!({"error": "boom"}))));
        assert_eq!(f.transport.calls(), vec![DIRECT_PATH]);
    }

    #[tokio::test]
    async fn test_local_target_with_blacklisted_direct() {
        let f = fixture(|_| {});
        f.router.health().record_failure(DIRECT_PATH, Duration::ZERO);

        let err = f
            .router
            .route(&RouteRequest::new("http://localhost:8080/", "x"))
            .await
            .unwrap_err();

        assert!(matches!(err, RouteError::Exhausted { last_error: None }));
        assert!(f.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_attempt_cap() {
        let f = fixture(|c| {
            c.routing.max_attempts = 2;
            c.paths.private_relay.endpoint = "https://relay.example/".into();
        });
        f.transport.script(DIRECT_PATH, network());
        f.transport
            .script(PRIVATE_RELAY_PATH, Err(TransportError::Timeout { timeout_ms: 8_000 }));

        let err = f
            .router
            .route(&RouteRequest::new(REMOTE, "x"))
            .await
            .unwrap_err();

        assert_eq!(f.transport.calls(), vec![DIRECT_PATH, PRIVATE_RELAY_PATH]);
        assert!(matches!(
            err.last_error(),
            Some(TransportError::Timeout { timeout_ms: 8_000 })
        ));
        assert!(f.router.health().is_usable("relay-a"));
    }

    #[tokio::test]
    async fn test_timeout_moves_on_to_next_candidate() {
        let f = fixture(|_| {});
        f.transport.script(DIRECT_PATH, network());
        f.transport
            .script("relay-a", Err(TransportError::Timeout { timeout_ms: 8_000 }));
        f.transport.script("relay-b", Ok(ResponseBody::Text("late but fine".into())));

        let body = f.router.route(&RouteRequest::new(REMOTE, "x")).await.unwrap();

        assert_eq!(body.as_text(), Some("late but fine"));
        assert!(!f.router.health().is_usable("relay-a"));
        assert_eq!(f.router.metrics()["relay-a"].attempts, 1);
        assert_eq!(f.router.metrics()["relay-b"].successes, 1);
    }

    #[tokio::test]
    async fn test_repeated_failures_quarantine_path() {
        let f = fixture(|_| {});
        for _ in 0..3 {
            let _ = f.router.route(&RouteRequest::new(REMOTE, "x")).await;
            f.clock.advance_ms(120_001);
        }

        let circuits = f.router.circuits();
        assert!(circuits[DIRECT_PATH].quarantine_until.is_some());
        assert!(!f.router.health().is_usable(DIRECT_PATH));
        // Each call made three attempts; the third round quarantined all three.
        assert_eq!(f.transport.calls().len(), 9);
    }

    #[tokio::test]
    async fn test_probe_clears_recovered_relays_only() {
        let f = fixture(|_| {});
        for name in [DIRECT_PATH, "relay-a", "relay-b"] {
            f.router.health().record_failure(name, Duration::ZERO);
        }
        f.transport.probe_status("https://a.example/", 204);
        f.transport.probe_status("https://b.example/?url=", 503);

        assert_eq!(f.router.probe_now().await, 1);

        assert!(f.router.health().is_usable("relay-a"));
        assert!(!f.router.health().is_usable("relay-b"));
        assert!(!f.router.health().is_usable(DIRECT_PATH));
        // Direct and the unconfigured private relay are never probed.
        assert_eq!(
            f.transport.probed(),
            vec!["https://a.example/", "https://b.example/?url="]
        );
    }

    #[tokio::test]
    async fn test_runtime_private_endpoint() {
        let f = fixture(|_| {});
        f.transport.script(DIRECT_PATH, network());
        f.transport
            .script(PRIVATE_RELAY_PATH, Ok(ResponseBody::Text("via relay".into())));

        f.router.set_private_endpoint(Some("https://relay.example/"));
        let body = f.router.route(&RouteRequest::new(REMOTE, "x")).await.unwrap();

        assert_eq!(body.as_text(), Some("via relay"));
        assert_eq!(f.transport.calls(), vec![DIRECT_PATH, PRIVATE_RELAY_PATH]);
        assert_eq!(f.router.diagnostics().sticky.as_deref(), Some(PRIVATE_RELAY_PATH));
    }
}
