//! End-to-end: HTTP shell → orchestrator → HTTP push client → mock transport,
//! with the `SQLite` registry underneath.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use janken_fanout::{BroadcastOrchestrator, DispatchConfig, FanoutDispatcher, OrchestratorConfig};
use janken_push::{HttpPushClient, PushConfig, SessionCache};
use janken_registry::{ConnectionRegistry, SqliteConfig, SqliteRegistry};
use janken_server::{JankenServer, ServerConfig};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: JankenServer,
    orchestrator: Arc<BroadcastOrchestrator>,
    registry: Arc<SqliteRegistry>,
    session: Arc<SessionCache>,
    _dir: tempfile::TempDir,
}

fn harness(push_base: &str, cleanup_stale: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(
        SqliteRegistry::open(&dir.path().join("connections.db"), &SqliteConfig::default()).unwrap(),
    );
    let session = SessionCache::new(Duration::from_secs(2));
    let push = HttpPushClient::with_session(
        PushConfig {
            base_url: format!("{push_base}/test"),
            auth_token: None,
            timeout: Duration::from_secs(2),
        },
        session.clone(),
    );
    let dispatcher = FanoutDispatcher::new(Arc::new(push), DispatchConfig::default());
    let orchestrator = Arc::new(BroadcastOrchestrator::new(
        registry.clone(),
        dispatcher,
        OrchestratorConfig {
            cleanup_stale,
            ..OrchestratorConfig::default()
        },
    ));
    let server = JankenServer::new(ServerConfig::default(), orchestrator.clone());
    Harness {
        server,
        orchestrator,
        registry,
        session,
        _dir: dir,
    }
}

async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = body.map_or_else(Body::empty, |v| Body::from(v.to_string()));
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn two_players_connect_and_start() {
    let transport = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({"type": "wait"})))
        .and(path("/test/@connections/A"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&transport)
        .await;
    Mock::given(method("POST"))
        .and(body_json(json!({"type": "start", "opponent": "Alice"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&transport)
        .await;

    let h = harness(&transport.uri(), false);

    let (status, _) = call(
        h.server.router(),
        "POST",
        "/connections/A",
        Some(json!({"displayName": "Alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Alice alone: wait
    let (status, body) = call(h.server.router(), "POST", "/connections/A/match", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["success"], 1);

    let (status, _) = call(h.server.router(), "POST", "/connections/B", None).await;
    assert_eq!(status, StatusCode::CREATED);

    // Bob joins: both get start naming Alice
    let (status, body) = call(h.server.router(), "POST", "/connections/B/match", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["success"], 2);
    assert_eq!(body["summary"]["failed"], json!([]));

    assert!(h.session.is_initialized());
    assert_eq!(h.session.active_leases(), 0);
}

#[tokio::test]
async fn stale_peer_reported_and_cleaned_up() {
    let transport = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/test/@connections/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&transport)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&transport)
        .await;

    let h = harness(&transport.uri(), true);
    for id in ["A", "gone", "C"] {
        let uri = format!("/connections/{id}");
        let (status, _) = call(h.server.router(), "POST", &uri, None).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = call(
        h.server.router(),
        "POST",
        "/connections/A/messages",
        Some(json!({"data": {"puck": [1, 2]}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["summary"]["success"], 2);
    assert_eq!(body["summary"]["failed"], json!(["gone"]));

    assert!(h.orchestrator.drain_cleanup(Duration::from_secs(5)).await);
    let ids: Vec<_> = h
        .registry
        .list_connections()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec!["A", "C"]);
}

#[tokio::test]
async fn rejected_credentials_fail_the_request() {
    let transport = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&transport)
        .await;

    let h = harness(&transport.uri(), false);
    let (_, _) = call(h.server.router(), "POST", "/connections/A", None).await;

    let (status, body) = call(
        h.server.router(),
        "POST",
        "/connections/A/messages",
        Some(json!({"data": "hi"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn disconnect_then_broadcast_has_no_connections() {
    let transport = MockServer::start().await;
    let h = harness(&transport.uri(), false);

    let (_, _) = call(h.server.router(), "POST", "/connections/A", None).await;
    let (_, body) = call(h.server.router(), "DELETE", "/connections/A", None).await;
    assert_eq!(body["removed"], true);

    let (status, body) = call(h.server.router(), "POST", "/connections/A/match", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "no_connections");
}

#[tokio::test]
async fn session_closes_after_shutdown() {
    let transport = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&transport)
        .await;

    let h = harness(&transport.uri(), false);
    let (_, _) = call(h.server.router(), "POST", "/connections/A", None).await;
    let (status, _) = call(h.server.router(), "POST", "/connections/A/match", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, handle) = h.server.listen().await.unwrap();
    assert!(h.server.shutdown().graceful_shutdown(vec![handle], None).await);
    h.session.close();

    assert!(!h.session.is_initialized());
}
