//! # janken-server
//!
//! Thin `axum` shell around the broadcast orchestrator.
//!
//! - Lifecycle endpoints: register and remove connection rows
//! - Broadcast endpoints: relay and matchmaking
//! - `/health` and Prometheus `/metrics`
//! - Permissive CORS and request tracing
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod shutdown;

pub use config::ServerConfig;
pub use server::{AppState, JankenServer};
