use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use certreq_core::{DownstreamError, StaticGateway};
use certreq_daemon::config::ServiceConfig;
use certreq_daemon::http::{self, HealthResponse};
use certreq_daemon::public_error::PublicErrorBody;
use certreq_daemon::telemetry::Telemetry;
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};

const SECRET: &str = "integration-secret-integration-secret";

#[derive(Serialize)]
struct Claims<'a> {
    sub: &'a str,
    iss: &'a str,
    role: &'a str,
    exp: u64,
}

fn bearer(secret: &str, exp_offset_secs: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_secs() as i64;
    let token = encode(
        &Header::default(),
        &Claims {
            sub: "EST001",
            iss: "universidad-issuer",
            role: "student",
            exp: (now + exp_offset_secs) as u64,
        },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token");
    format!("Bearer {token}")
}

struct TestServer {
    addr: SocketAddr,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start(gateway: Arc<StaticGateway>, cfg: ServiceConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        let state =
            http::build_state_with_gateway(&cfg, Arc::new(Telemetry::new()), gateway);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = http::serve(listener, state, async move {
                let _ = rx.await;
            })
            .await;
        });
        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

#[tokio::test]
async fn transcript_scenario_end_to_end() {
    let gateway = Arc::new(StaticGateway::succeeding("CERT_42"));
    let server = TestServer::start(gateway, ServiceConfig::new(SECRET)).await;
    let client = reqwest::Client::new();
    let auth = bearer(SECRET, 3600);

    let created = client
        .post(server.url("/v1/requests"))
        .header("authorization", &auth)
        .header("x-correlation-id", "corr-e2e")
        .json(&json!({"type": "TRANSCRIPT", "studentSubjectId": "S123"}))
        .send()
        .await
        .expect("create");
    assert_eq!(created.status(), StatusCode::OK);
    let created: Value = created.json().await.expect("json");
    assert_eq!(created["state"], "PROCESSED");
    assert_eq!(created["certificationResult"], "CERT_42");
    assert_eq!(created["studentSubjectId"], "S123");
    assert_eq!(created["correlationId"], "corr-e2e");
    let id = created["id"].as_str().expect("id").to_string();

    let fetched = client
        .get(server.url(&format!("/v1/requests/{id}")))
        .header("authorization", &auth)
        .send()
        .await
        .expect("get");
    assert_eq!(fetched.status(), StatusCode::OK);
    let fetched: Value = fetched.json().await.expect("json");
    assert_eq!(fetched, created);

    let denied = client
        .get(server.url(&format!("/v1/requests/{id}")))
        .header("authorization", "Bearer not-a-token")
        .send()
        .await
        .expect("get");
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
    let body: PublicErrorBody = denied.json().await.expect("json");
    assert_eq!(body.code, "UNAUTHORIZED");

    server.stop().await;
}

#[tokio::test]
async fn failing_gateway_yields_needs_review_with_200() {
    let gateway = Arc::new(StaticGateway::failing(DownstreamError::Unavailable(
        "soap down".to_string(),
    )));
    let server = TestServer::start(gateway.clone(), ServiceConfig::new(SECRET)).await;
    let client = reqwest::Client::new();
    let auth = bearer(SECRET, 3600);

    let resp = client
        .post(server.url("/v1/requests"))
        .header("authorization", &auth)
        .json(&json!({"type": "DIPLOMA", "studentSubjectId": "S7"}))
        .send()
        .await
        .expect("create");
    assert_eq!(resp.status(), StatusCode::OK);
    let v: Value = resp.json().await.expect("json");
    assert_eq!(v["state"], "NEEDS_REVIEW");
    assert!(v.get("certificationResult").is_none());
    assert!(v["notes"].as_str().unwrap_or_default().contains("manual review"));

    gateway.succeed_with("CERT_77");
    let resp = client
        .post(server.url("/v1/requests"))
        .header("authorization", &auth)
        .json(&json!({"type": "DIPLOMA", "studentSubjectId": "S7"}))
        .send()
        .await
        .expect("create");
    let v: Value = resp.json().await.expect("json");
    assert_eq!(v["state"], "PROCESSED");
    assert_eq!(v["certificationResult"], "CERT_77");

    server.stop().await;
}

#[tokio::test]
async fn rejections_use_public_error_shape() {
    let gateway = Arc::new(StaticGateway::succeeding("CERT_1"));
    let server = TestServer::start(gateway.clone(), ServiceConfig::new(SECRET)).await;
    let client = reqwest::Client::new();
    let auth = bearer(SECRET, 3600);
    let url = server.url("/v1/requests");

    let expired = client
        .post(&url)
        .header("authorization", bearer(SECRET, -60))
        .json(&json!({"type": "TRANSCRIPT", "studentSubjectId": "S1"}))
        .send()
        .await
        .expect("send");
    assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);

    let missing = client
        .post(&url)
        .json(&json!({"type": "TRANSCRIPT", "studentSubjectId": "S1"}))
        .send()
        .await
        .expect("send");
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let blank = client
        .post(&url)
        .header("authorization", &auth)
        .json(&json!({"type": "", "studentSubjectId": "S1"}))
        .send()
        .await
        .expect("send");
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    let body: PublicErrorBody = blank.json().await.expect("json");
    assert_eq!(body.code, "INVALID_INPUT");

    let garbage = client
        .post(&url)
        .header("authorization", &auth)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("send");
    assert_eq!(garbage.status(), StatusCode::BAD_REQUEST);

    let unknown = client
        .get(server.url("/v1/requests/00000000-0000-4000-8000-000000000000"))
        .header("authorization", &auth)
        .send()
        .await
        .expect("send");
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    let body: PublicErrorBody = unknown.json().await.expect("json");
    assert_eq!(body.code, "NOT_FOUND");

    assert_eq!(gateway.calls(), 0);
    server.stop().await;
}

#[tokio::test]
async fn configured_issuer_is_enforced() {
    let gateway = Arc::new(StaticGateway::succeeding("CERT_1"));
    let mut cfg = ServiceConfig::new(SECRET);
    cfg.jwt_issuer = Some("another-issuer".to_string());
    let server = TestServer::start(gateway, cfg).await;

    let resp = reqwest::Client::new()
        .post(server.url("/v1/requests"))
        .header("authorization", bearer(SECRET, 3600))
        .json(&json!({"type": "TRANSCRIPT", "studentSubjectId": "S1"}))
        .send()
        .await
        .expect("send");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    server.stop().await;
}

#[tokio::test]
async fn oversized_body_rejected() {
    let gateway = Arc::new(StaticGateway::succeeding("CERT_1"));
    let mut cfg = ServiceConfig::new(SECRET);
    cfg.max_body_bytes = 64;
    let server = TestServer::start(gateway.clone(), cfg).await;

    let resp = reqwest::Client::new()
        .post(server.url("/v1/requests"))
        .header("authorization", bearer(SECRET, 3600))
        .json(&json!({
            "type": "TRANSCRIPT",
            "studentSubjectId": "S1",
            "document": "x".repeat(512),
        }))
        .send()
        .await
        .expect("send");
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(gateway.calls(), 0);
    server.stop().await;
}

#[tokio::test]
async fn health_and_metrics_endpoints() {
    let gateway = Arc::new(StaticGateway::succeeding("CERT_5"));
    let server = TestServer::start(gateway, ServiceConfig::new(SECRET)).await;
    let client = reqwest::Client::new();

    let health: HealthResponse = client
        .get(server.url("/health"))
        .send()
        .await
        .expect("health")
        .json()
        .await
        .expect("json");
    assert_eq!(health.status, "UP");
    assert_eq!(health.service, "certreq-daemon");

    let resp = client
        .post(server.url("/v1/requests"))
        .header("authorization", bearer(SECRET, 3600))
        .json(&json!({"type": "TRANSCRIPT", "studentSubjectId": "S1"}))
        .send()
        .await
        .expect("create");
    assert_eq!(resp.status(), StatusCode::OK);

    let metrics = client
        .get(server.url("/metrics"))
        .send()
        .await
        .expect("metrics")
        .text()
        .await
        .expect("text");
    assert!(metrics.contains("certreq_submissions_total{state=\"PROCESSED\"} 1"));
    assert!(metrics.contains("certreq_requests{state=\"PROCESSED\"} 1"));
    assert!(metrics.contains("certreq_requests{state=\"PENDING\"} 0"));

    server.stop().await;
}

#[tokio::test]
async fn client_disconnect_does_not_strand_pending_request() {
    let gateway =
        Arc::new(StaticGateway::succeeding("CERT_1").with_delay(Duration::from_millis(800)));
    let server = TestServer::start(gateway.clone(), ServiceConfig::new(SECRET)).await;

    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .expect("client");
    let result = impatient
        .post(server.url("/v1/requests"))
        .header("authorization", bearer(SECRET, 3600))
        .json(&json!({"type": "TRANSCRIPT", "studentSubjectId": "S1"}))
        .send()
        .await;
    assert!(result.is_err());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let metrics = reqwest::Client::new()
        .get(server.url("/metrics"))
        .send()
        .await
        .expect("metrics")
        .text()
        .await
        .expect("text");
    assert_eq!(gateway.calls(), 1);
    assert!(metrics.contains("certreq_requests{state=\"PENDING\"} 0"));
    assert!(metrics.contains("certreq_requests{state=\"PROCESSED\"} 1"));

    server.stop().await;
}
