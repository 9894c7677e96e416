//! `JankenServer`: Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::http::{Method, header};
use axum::routing::{get, post};
use janken_fanout::BroadcastOrchestrator;
use janken_registry::ConnectionRegistry;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::routes;
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast entry point.
    pub orchestrator: Arc<BroadcastOrchestrator>,
    /// Registry used by the lifecycle endpoints.
    pub registry: Arc<dyn ConnectionRegistry>,
    /// Prometheus handle, if a recorder was installed.
    pub metrics: Option<PrometheusHandle>,
    /// When the server started.
    pub start_time: Instant,
}

/// The HTTP server.
pub struct JankenServer {
    config: ServerConfig,
    orchestrator: Arc<BroadcastOrchestrator>,
    metrics: Option<PrometheusHandle>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl JankenServer {
    /// Create a new server around an orchestrator.
    pub fn new(config: ServerConfig, orchestrator: Arc<BroadcastOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
            metrics: None,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Serve `/metrics` from this handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            orchestrator: self.orchestrator.clone(),
            registry: self.orchestrator.registry().clone(),
            metrics: self.metrics.clone(),
            start_time: self.start_time,
        };

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        Router::new()
            .route("/connections", get(routes::list_connections))
            .route(
                "/connections/{id}",
                post(routes::register_connection).delete(routes::remove_connection),
            )
            .route("/connections/{id}/messages", post(routes::send_message))
            .route("/connections/{id}/match", post(routes::matchmake))
            .route("/health", get(routes::health_handler))
            .route("/metrics", get(routes::metrics_handler))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(state)
    }

    /// Bind and serve in a background task until shutdown is signalled.
    ///
    /// Returns the bound address and the serve task's handle.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "http server exited with error");
            }
        });

        info!(%addr, "http server listening");
        Ok((addr, handle))
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the orchestrator.
    pub fn orchestrator(&self) -> &Arc<BroadcastOrchestrator> {
        &self.orchestrator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use janken_core::{Connection, DeliveryError};
    use janken_fanout::{DispatchConfig, FanoutDispatcher, OrchestratorConfig};
    use janken_push::testutil::ScriptedPush;
    use janken_registry::MemoryRegistry;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn make_server(rows: Vec<Connection>, push: ScriptedPush) -> (JankenServer, Arc<ScriptedPush>) {
        let registry = Arc::new(MemoryRegistry::with_connections(rows));
        let push = Arc::new(push);
        let dispatcher = FanoutDispatcher::new(push.clone(), DispatchConfig::default());
        let orchestrator = Arc::new(BroadcastOrchestrator::new(
            registry,
            dispatcher,
            OrchestratorConfig::default(),
        ));
        (JankenServer::new(ServerConfig::default(), orchestrator), push)
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_endpoint_reports_connections() {
        let (server, _) = make_server(vec![Connection::new("A")], ScriptedPush::new());
        let (status, body) = send(server.router(), "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connections"], 1);
        assert!(body["uptimeSecs"].is_number());
    }

    #[tokio::test]
    async fn register_then_list_then_remove() {
        let (server, _) = make_server(vec![], ScriptedPush::new());

        let (status, body) = send(
            server.router(),
            "POST",
            "/connections/A",
            Some(json!({"displayName": "Alice"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"id": "A", "displayName": "Alice"}));

        let (status, _) = send(server.router(), "POST", "/connections/B", None).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = send(server.router(), "GET", "/connections", None).await;
        assert_eq!(
            body["connections"],
            json!([{"id": "A", "displayName": "Alice"}, {"id": "B"}])
        );

        let (status, body) = send(server.router(), "DELETE", "/connections/A", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"removed": true}));

        let (_, body) = send(server.router(), "DELETE", "/connections/A", None).await;
        assert_eq!(body, json!({"removed": false}));
    }

    #[tokio::test]
    async fn register_rejects_malformed_body() {
        let (server, _) = make_server(vec![], ScriptedPush::new());
        let req = Request::builder()
            .method("POST")
            .uri("/connections/A")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn relay_returns_summary_with_partial_failure() {
        let (server, push) = make_server(
            vec![Connection::new("A"), Connection::new("B")],
            ScriptedPush::new().fail("B", DeliveryError::stale("410 Gone")),
        );

        let (status, body) = send(
            server.router(),
            "POST",
            "/connections/A/messages",
            Some(json!({"data": {"hand": "rock"}})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["summary"]["success"], 1);
        assert_eq!(body["summary"]["failed"], json!(["B"]));
        assert_eq!(push.called_ids(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn relay_without_data_sends_null() {
        let (server, push) = make_server(
            vec![Connection::new("A"), Connection::new("B")],
            ScriptedPush::new(),
        );
        let (status, body) = send(
            server.router(),
            "POST",
            "/connections/A/messages",
            Some(json!({"move": "rock"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["summary"]["success"], 2);
        let calls = push.calls();
        assert_eq!(calls.len(), 2);
        for (_, payload) in &calls {
            assert_eq!(payload, r#"{"type":"relay","data":null}"#);
        }
    }

    #[tokio::test]
    async fn relay_with_non_object_body_is_bad_request() {
        let (server, push) = make_server(vec![Connection::new("A")], ScriptedPush::new());
        let (status, body) = send(
            server.router(),
            "POST",
            "/connections/A/messages",
            Some(json!(["data"])),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"]["code"], "bad_request");
        assert!(push.calls().is_empty());
    }

    #[tokio::test]
    async fn broadcast_to_empty_registry_is_conflict() {
        let (server, _) = make_server(vec![], ScriptedPush::new());
        let (status, body) = send(server.router(), "POST", "/connections/A/match", None).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "no_connections");
    }

    #[tokio::test]
    async fn rejected_credentials_are_bad_gateway() {
        let (server, _) = make_server(
            vec![Connection::new("A")],
            ScriptedPush::new().fail("A", DeliveryError::unauthorized("403 Forbidden")),
        );
        let (status, body) = send(server.router(), "POST", "/connections/A/match", None).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "unauthorized");
    }

    #[tokio::test]
    async fn matchmaking_sends_start() {
        let (server, push) = make_server(
            vec![Connection::named("A", "Alice"), Connection::new("B")],
            ScriptedPush::new(),
        );
        let (status, body) = send(server.router(), "POST", "/connections/B/match", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["success"], 2);
        let (_, payload) = &push.calls()[0];
        assert_eq!(payload, r#"{"type":"start","opponent":"Alice"}"#);
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_not_found() {
        let (server, _) = make_server(vec![], ScriptedPush::new());
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_preflight_allows_any_origin() {
        let (server, _) = make_server(vec![], ScriptedPush::new());
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/connections/A/messages")
            .header("origin", "https://game.example")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let headers = resp.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        let methods = headers["access-control-allow-methods"].to_str().unwrap();
        assert!(methods.contains("POST"));
        assert!(methods.contains("DELETE"));
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (server, _) = make_server(vec![], ScriptedPush::new());
        let req = Request::builder().uri("/nonexistent").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_and_shut_down() {
        let (server, _) = make_server(vec![], ScriptedPush::new());
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);

        let finished = server.shutdown().graceful_shutdown(vec![handle], None).await;
        assert!(finished);
    }
}
