//! # janken-fanout
//!
//! The broadcast path: read the registry, pick the message, push it to
//! every connection at once, and summarize.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `dispatcher` | Concurrent per-target delivery, deadline, fail-fast on bad credentials |
//! | `orchestrator` | Registry snapshot → matchmaking/relay → dispatcher |
//! | `cleanup` | Optional background removal of stale registry rows |
//! | `metrics` | Metric names shared with the server crate |

#![deny(unsafe_code)]

pub mod cleanup;
pub mod dispatcher;
pub mod metrics;
pub mod orchestrator;

pub use cleanup::StaleCleanup;
pub use dispatcher::{DispatchConfig, FanoutDispatcher};
pub use orchestrator::{BroadcastMode, BroadcastOrchestrator, OrchestratorConfig};

#[cfg(test)]
mod testing;
