//! Integration tests for the relay daemon.
//!
//! These tests start a real relay instance on an ephemeral port and drive
//! it over HTTP to verify end-to-end behavior, including request signing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ring::hmac;
use serde_json::{json, Value};

use aufait_relay::auth::{canonical_string, NonceCache, RateLimiter, RequestAuthenticator};
use aufait_relay::relay::RelayService;
use aufait_relay::server::{build_router, AppState};
use aufait_relay::store::EventQueueStore;

const TEST_SECRET: &str = "test-secret-key-for-integration-tests";

/// Test relay instance.
struct TestRelay {
    base_url: String,
}

impl TestRelay {
    /// Start a relay with authentication disabled.
    async fn start() -> Self {
        Self::start_with(None, 240).await
    }

    /// Start a relay with a shared secret configured.
    async fn start_signed() -> Self {
        Self::start_with(Some(TEST_SECRET), 240).await
    }

    /// Start a relay with explicit auth and rate limit settings.
    async fn start_with(secret: Option<&str>, rate_max: usize) -> Self {
        let nonce_cache = Arc::new(NonceCache::new(600_000));
        let authenticator = Arc::new(RequestAuthenticator::new(
            secret.unwrap_or(""),
            Arc::clone(&nonce_cache),
            300_000,
        ));
        let rate_limiter = Arc::new(RateLimiter::new(rate_max, 60_000));
        let store = Arc::new(EventQueueStore::new(500, 10_000));
        let relay = Arc::new(RelayService::new(store, 100));

        let state = AppState {
            relay,
            authenticator,
            rate_limiter,
            max_push_body_bytes: 64 * 1024,
        };
        let app = build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server failed");
        });

        Self {
            base_url: format!("http://{}", addr),
        }
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }
}

fn epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Clock before epoch")
        .as_millis() as i64
}

/// Sign a request the way a relay client does.
fn sign(method: &str, path_and_query: &str, ts_ms: i64, nonce: &str, body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, TEST_SECRET.as_bytes());
    let canonical = canonical_string(method, path_and_query, ts_ms, nonce, body);
    hex::encode(hmac::sign(&key, canonical.as_bytes()).as_ref())
}

async fn error_code(response: reqwest::Response) -> String {
    let body: Value = response.json().await.expect("Error body is not JSON");
    body["error"].as_str().expect("Missing error code").to_string()
}

#[tokio::test]
async fn test_healthz_reports_liveness() {
    let relay = TestRelay::start().await;
    let before = epoch_ms();

    let response = reqwest::get(relay.url("/healthz")).await.unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], json!(true));
    assert!(body["ts"].as_i64().unwrap() >= before);
}

#[tokio::test]
async fn test_push_then_pull_round_trip() {
    let relay = TestRelay::start().await;
    let client = reqwest::Client::new();
    let before = epoch_ms();

    let response = client
        .post(relay.url("/v1/push"))
        .json(&json!({
            "toRef": "node-B",
            "type": "msg",
            "messageId": "m1",
            "fromNodeId": "node-A",
            "body": "hi"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let ack: Value = response.json().await.unwrap();
    assert_eq!(ack["ok"], json!(true));
    assert_eq!(ack["queuedFor"], json!("node-B"));
    let event_id = ack["eventId"].as_str().unwrap().to_string();
    assert!(!event_id.is_empty());

    let response = client
        .get(relay.url("/v1/pull?nodeId=node-B"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let batch: Value = response.json().await.unwrap();
    let events = batch["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], json!("msg"));
    assert_eq!(events[0]["messageId"], json!("m1"));
    assert_eq!(events[0]["body"], json!("hi"));
    assert_eq!(events[0]["eventId"], json!(event_id));
    assert!(events[0]["timestampMs"].as_i64().unwrap() >= before);

    // Pull is destructive; the queue is now empty
    let response = client
        .get(relay.url("/v1/pull?nodeId=node-B"))
        .send()
        .await
        .unwrap();
    let batch: Value = response.json().await.unwrap();
    assert!(batch["events"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_receipt_round_trip_has_no_body_field() {
    let relay = TestRelay::start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(relay.url("/v1/push"))
        .json(&json!({
            "toRef": "node-B",
            "type": "receipt",
            "messageId": "m1",
            "fromNodeId": "node-A",
            "receiptKind": "delivered"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let batch: Value = client
        .get(relay.url("/v1/pull?nodeId=node-B"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let event = &batch["events"][0];
    assert_eq!(event["type"], json!("receipt"));
    assert_eq!(event["receiptKind"], json!("delivered"));
    assert!(event.get("body").is_none());
}

#[tokio::test]
async fn test_pull_without_node_id_rejected() {
    let relay = TestRelay::start().await;

    let response = reqwest::get(relay.url("/v1/pull")).await.unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(error_code(response).await, "missing_nodeId");
}

#[tokio::test]
async fn test_unknown_path_not_found() {
    let relay = TestRelay::start().await;

    let response = reqwest::get(relay.url("/v2/pull?nodeId=a")).await.unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(error_code(response).await, "not_found");
}

#[tokio::test]
async fn test_push_body_size_bounds() {
    let relay = TestRelay::start().await;
    let client = reqwest::Client::new();

    // Empty body is rejected like an oversized one
    let response = client
        .post(relay.url("/v1/push"))
        .body(Vec::new())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 413);
    assert_eq!(error_code(response).await, "body_too_large");

    let response = client
        .post(relay.url("/v1/push"))
        .body(vec![b'x'; 64 * 1024 + 1])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 413);
    assert_eq!(error_code(response).await, "body_too_large");
}

#[tokio::test]
async fn test_msg_body_length_boundary() {
    let relay = TestRelay::start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(relay.url("/v1/push"))
        .json(&json!({
            "toRef": "node-B",
            "type": "msg",
            "messageId": "m1",
            "body": "a".repeat(16_001)
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(error_code(response).await, "msg_too_large");

    let response = client
        .post(relay.url("/v1/push"))
        .json(&json!({
            "toRef": "node-B",
            "type": "msg",
            "messageId": "m1",
            "body": "a".repeat(16_000)
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_signed_push_and_replay_rejection() {
    let relay = TestRelay::start_signed().await;
    let client = reqwest::Client::new();

    let body = json!({
        "toRef": "node-B",
        "type": "msg",
        "messageId": "m1",
        "body": "hi"
    })
    .to_string();

    // Unsigned request is rejected
    let response = client
        .post(relay.url("/v1/push"))
        .body(body.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    assert_eq!(error_code(response).await, "missing_auth");

    // Correctly signed request is accepted
    let ts = epoch_ms();
    let nonce = "integration-nonce-1";
    let sig = sign("POST", "/v1/push", ts, nonce, body.as_bytes());

    let send_signed = || {
        client
            .post(relay.url("/v1/push"))
            .header("X-AF-TS", ts.to_string())
            .header("X-AF-NONCE", nonce)
            .header("X-AF-SIG", sig.as_str())
            .header("X-AF-ALG", "HMAC-SHA256")
            .body(body.clone())
            .send()
    };

    let response = send_signed().await.unwrap();
    assert_eq!(response.status(), 200);

    // Replaying the identical request is rejected
    let response = send_signed().await.unwrap();
    assert_eq!(response.status(), 401);
    assert_eq!(error_code(response).await, "replay_nonce");
}

#[tokio::test]
async fn test_signed_pull_covers_query_string() {
    let relay = TestRelay::start_signed().await;
    let client = reqwest::Client::new();

    let path = "/v1/pull?nodeId=node-B";
    let ts = epoch_ms();
    let sig = sign("GET", path, ts, "pull-nonce-1", b"");

    let response = client
        .get(relay.url(path))
        .header("X-AF-TS", ts.to_string())
        .header("X-AF-NONCE", "pull-nonce-1")
        .header("X-AF-SIG", sig)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let batch: Value = response.json().await.unwrap();
    assert!(batch["events"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_stale_timestamp_rejected() {
    let relay = TestRelay::start_signed().await;
    let client = reqwest::Client::new();

    let path = "/v1/pull?nodeId=node-B";
    let ts = epoch_ms() - 300_001;
    let sig = sign("GET", path, ts, "stale-nonce-1", b"");

    let response = client
        .get(relay.url(path))
        .header("X-AF-TS", ts.to_string())
        .header("X-AF-NONCE", "stale-nonce-1")
        .header("X-AF-SIG", sig)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    assert_eq!(error_code(response).await, "stale_ts");
}

#[tokio::test]
async fn test_tampered_body_rejected() {
    let relay = TestRelay::start_signed().await;
    let client = reqwest::Client::new();

    let signed_body = json!({"toRef": "node-B", "type": "msg", "messageId": "m1"}).to_string();
    let sent_body = json!({"toRef": "node-C", "type": "msg", "messageId": "m1"}).to_string();

    let ts = epoch_ms();
    let sig = sign("POST", "/v1/push", ts, "tamper-nonce-1", signed_body.as_bytes());

    let response = client
        .post(relay.url("/v1/push"))
        .header("X-AF-TS", ts.to_string())
        .header("X-AF-NONCE", "tamper-nonce-1")
        .header("X-AF-SIG", sig)
        .body(sent_body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    assert_eq!(error_code(response).await, "bad_sig");
}

#[tokio::test]
async fn test_rate_limit_shared_across_operations() {
    let relay = TestRelay::start_with(None, 3).await;
    let client = reqwest::Client::new();

    // Health and pull draw from the same per-client budget
    assert_eq!(
        client.get(relay.url("/healthz")).send().await.unwrap().status(),
        200
    );
    assert_eq!(
        client
            .get(relay.url("/v1/pull?nodeId=a"))
            .send()
            .await
            .unwrap()
            .status(),
        200
    );
    assert_eq!(
        client.get(relay.url("/healthz")).send().await.unwrap().status(),
        200
    );

    let response = client.get(relay.url("/healthz")).send().await.unwrap();
    assert_eq!(response.status(), 429);
    assert_eq!(error_code(response).await, "rate_limited");
}
