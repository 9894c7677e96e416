//! Metric names, shared so the server and fan-out crates agree on spelling.

/// Broadcast invocations (counter, labels: mode).
pub const BROADCAST_REQUESTS_TOTAL: &str = "broadcast_requests_total";
/// Invocation-fatal broadcast errors (counter, labels: `error_type`).
pub const BROADCAST_ERRORS_TOTAL: &str = "broadcast_errors_total";
/// Broadcast wall-clock duration (histogram).
pub const BROADCAST_DURATION_SECONDS: &str = "broadcast_duration_seconds";
/// Per-target push results (counter, labels: outcome).
pub const PUSH_DELIVERIES_TOTAL: &str = "push_deliveries_total";
/// Stale-row cleanup attempts (counter, labels: status).
pub const REGISTRY_CLEANUPS_TOTAL: &str = "registry_cleanups_total";
/// Connections registered through the lifecycle endpoint (counter).
pub const CONNECTIONS_REGISTERED_TOTAL: &str = "connections_registered_total";
/// Connections removed through the lifecycle endpoint (counter).
pub const CONNECTIONS_REMOVED_TOTAL: &str = "connections_removed_total";
