//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `"ok"`, or `"degraded"` when the registry could not be read.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Registered connection count (0 when the registry is unreadable).
    pub connections: usize,
}

/// Build a health response. `connections` is `None` if the registry read
/// failed.
pub fn health_check(start_time: Instant, connections: Option<usize>) -> HealthResponse {
    HealthResponse {
        status: if connections.is_some() { "ok" } else { "degraded" }.into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections: connections.unwrap_or(0),
    }
}
