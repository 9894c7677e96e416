//! HTTP handlers.
//!
//! Handlers only parse, call the registry or orchestrator, and shape the
//! response. Per-target delivery failures come back as data inside a 200;
//! only invocation-fatal errors change the status code.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use janken_core::{BroadcastError, Connection, DeliverySummary};
use janken_registry::RegistryError;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::health::{self, HealthResponse};
use crate::metrics::{CONNECTIONS_REGISTERED_TOTAL, CONNECTIONS_REMOVED_TOTAL};
use crate::server::AppState;

/// Errors a handler can return.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invocation-level failure from the core.
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
    /// The request body could not be parsed.
    #[error("{0}")]
    BadRequest(String),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self::Broadcast(err.into())
    }
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Broadcast(e) => match e {
                BroadcastError::NoConnections => StatusCode::CONFLICT,
                BroadcastError::RegistryUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                BroadcastError::Unauthorized { .. } => StatusCode::BAD_GATEWAY,
                BroadcastError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Stable error code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Broadcast(e) => e.code(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            ok: false,
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Successful broadcast response.
#[derive(Debug, Serialize)]
pub struct BroadcastResponse {
    /// Always `true`; partial delivery failures are listed in `summary`.
    pub ok: bool,
    /// Per-target outcomes.
    pub summary: DeliverySummary,
}

impl From<DeliverySummary> for BroadcastResponse {
    fn from(summary: DeliverySummary) -> Self {
        Self { ok: true, summary }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody {
    #[serde(default)]
    display_name: Option<String>,
}

fn parse_json<T: serde::de::DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))
}

/// `POST /connections/{id}`: add or update a registry row.
pub async fn register_connection(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<Connection>), ApiError> {
    let RegisterBody { display_name } = parse_json(&body)?;
    let connection = Connection {
        id,
        display_name: display_name.filter(|n| !n.trim().is_empty()),
    };

    state.registry.register(connection.clone()).await?;
    counter!(CONNECTIONS_REGISTERED_TOTAL).increment(1);
    info!(connection_id = %connection.id, "connection registered");

    Ok((StatusCode::CREATED, Json(connection)))
}

/// `DELETE /connections/{id}`: remove a registry row.
pub async fn remove_connection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let removed = state.registry.remove(&id).await?;
    if removed {
        counter!(CONNECTIONS_REMOVED_TOTAL).increment(1);
        info!(connection_id = %id, "connection removed");
    }
    Ok(Json(serde_json::json!({ "removed": removed })))
}

/// `GET /connections`: the current registry snapshot.
pub async fn list_connections(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let connections = state.registry.list_connections().await?;
    Ok(Json(serde_json::json!({ "connections": connections })))
}

/// `POST /connections/{id}/messages`: relay `data` (null if absent) to everyone.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<BroadcastResponse>, ApiError> {
    let parsed: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?;
    let Value::Object(mut fields) = parsed else {
        return Err(ApiError::BadRequest("body must be a JSON object".into()));
    };
    // Absent `data` relays as null.
    let data = fields.remove("data").unwrap_or(Value::Null);

    let summary = state.orchestrator.relay(&id, data).await?;
    Ok(Json(summary.into()))
}

/// `POST /connections/{id}/match`: wait/start broadcast.
pub async fn matchmake(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BroadcastResponse>, ApiError> {
    let summary = state.orchestrator.matchmake(&id).await?;
    Ok(Json(summary.into()))
}

/// `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = match state.registry.list_connections().await {
        Ok(rows) => Some(rows.len()),
        Err(e) => {
            warn!(error = %e, "health check could not read registry");
            None
        }
    };
    Json(health::health_check(state.start_time, connections))
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            crate::metrics::render(handle),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
