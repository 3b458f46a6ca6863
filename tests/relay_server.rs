//! Private relay server behaviour over real sockets.

use std::net::SocketAddr;

use reqwest::StatusCode;
use serde_json::Value;

use relay_router::config::RelayConfig;
use relay_router::lifecycle::Shutdown;
use relay_router::relay::{RelayServer, RelaySettings};

mod common;
use common::{closed_port, MockReply, MockUpstream};

const SITE: &str = "https://site.example";

struct RunningRelay {
    addr: SocketAddr,
    shutdown: Shutdown,
}

impl RunningRelay {
    async fn start(config: RelayConfig, token: Option<&str>) -> Self {
        let settings = RelaySettings::new(&config, token.map(str::to_string));
        let server = RelayServer::with_settings(&config, settings).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        tokio::spawn(server.run(listener, shutdown.subscribe()));
        Self { addr, shutdown }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningRelay {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

fn fixed_target(upstream: &MockUpstream) -> RelayConfig {
    RelayConfig {
        target_url: Some(format!("{}frontend", upstream.url())),
        allowed_origins: vec![SITE.to_string()],
        ..RelayConfig::default()
    }
}

#[tokio::test]
async fn test_forwards_to_fixed_target() {
    let upstream = MockUpstream::start(MockReply::json(201, r#"{"created":true}"#)).await;
    let mut config = fixed_target(&upstream);
    config.upstream_auth_header = Some("Authorization".into());
    let relay = RunningRelay::start(config, Some("Bearer upstream-token")).await;

    let response = reqwest::Client::new()
        .post(relay.url("/anything"))
        .header("Origin", SITE)
        .header("Content-Type", "application/json")
        .header("Accept", "text/html")
        .header("X-Trace", "abc")
        .body(r#"{"msisdn":"3331234567"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], SITE);
    assert_eq!(headers["access-control-allow-methods"], "GET,POST,OPTIONS");
    assert!(headers.contains_key("x-request-id"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["created"], true);

    let seen = upstream.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].path, "/frontend");
    assert_eq!(seen[0].body, r#"{"msisdn":"3331234567"}"#);
    assert_eq!(seen[0].header("accept"), Some("application/json, text/plain, */*"));
    assert_eq!(seen[0].header("authorization"), Some("Bearer upstream-token"));
    assert_eq!(seen[0].header("x-trace"), Some("abc"));
    assert_eq!(seen[0].header("origin"), None);
}

#[tokio::test]
async fn test_rejects_unknown_and_missing_origin() {
    let upstream = MockUpstream::start(MockReply::json(200, "{}")).await;
    let relay = RunningRelay::start(fixed_target(&upstream), None).await;
    let client = reqwest::Client::new();

    let evil = client
        .post(relay.url("/"))
        .header("Origin", "https://evil.example")
        .send()
        .await
        .unwrap();
    assert_eq!(evil.status(), StatusCode::FORBIDDEN);
    assert_eq!(evil.text().await.unwrap(), "Origin not allowed");

    let anonymous = client.post(relay.url("/")).send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::FORBIDDEN);

    assert!(upstream.requests().is_empty());
}

#[tokio::test]
async fn test_preflight() {
    let upstream = MockUpstream::start(MockReply::json(200, "{}")).await;
    let relay = RunningRelay::start(fixed_target(&upstream), None).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, relay.url("/"))
        .header("Origin", SITE)
        .header("Access-Control-Request-Headers", "content-type, x-client")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], SITE);
    assert_eq!(headers["access-control-allow-headers"], "content-type, x-client");
    assert_eq!(headers["access-control-max-age"], "86400");
    assert!(upstream.requests().is_empty());
}

#[tokio::test]
async fn test_unrestricted_relay_accepts_server_clients() {
    let upstream = MockUpstream::start(MockReply::text(200, "pong")).await;
    let config = RelayConfig {
        allowed_origins: Vec::new(),
        ..fixed_target(&upstream)
    };
    let relay = RunningRelay::start(config, None).await;

    let response = reqwest::Client::new()
        .get(relay.url("/"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.text().await.unwrap(), "pong");
    assert_eq!(upstream.requests()[0].method, "GET");
}

#[tokio::test]
async fn test_query_target_when_enabled() {
    let upstream = MockUpstream::start(MockReply::json(200, r#"{"via":"query"}"#)).await;
    let config = RelayConfig {
        allow_any_target: true,
        ..RelayConfig::default()
    };
    let relay = RunningRelay::start(config, None).await;
    let client = reqwest::Client::new();

    let target: String =
        url::form_urlencoded::byte_serialize(format!("{}v1/check?x=1", upstream.url()).as_bytes())
            .collect();
    let response = client
        .post(relay.url(&format!("/?target={target}")))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(upstream.requests()[0].path, "/v1/check?x=1");

    let invalid = client
        .post(relay.url("/?target=not-a-url"))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let missing = client.post(relay.url("/")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(missing.text().await.unwrap(), "No upstream target configured");
}

#[tokio::test]
async fn test_upstream_failure_is_proxy_error() {
    let down = closed_port();
    let config = RelayConfig {
        target_url: Some(format!("http://{down}/")),
        ..RelayConfig::default()
    };
    let relay = RunningRelay::start(config, None).await;

    let response = reqwest::Client::new()
        .post(relay.url("/"))
        .header("Origin", SITE)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.headers()["access-control-allow-origin"], SITE);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "proxy_error");
    let message = body["message"].as_str().unwrap();
    assert!(!message.contains(&down.to_string()));
}
