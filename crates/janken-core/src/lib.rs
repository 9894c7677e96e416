//! # janken-core
//!
//! Shared types for the Janken Hockey fan-out service.
//!
//! - [`Connection`]: one live client session, as read from the registry
//! - [`BroadcastMessage`]: the `relay` / `wait` / `start` wire payloads
//! - [`DeliveryOutcome`] and [`DeliverySummary`]: per-target and aggregated push results
//! - [`DeliveryError`] and [`BroadcastError`]: per-target and invocation-level failures
//! - [`matchmaking::evaluate`]: derives `wait` or `start` from a registry snapshot

#![deny(unsafe_code)]

pub mod connection;
pub mod delivery;
pub mod errors;
pub mod matchmaking;
pub mod message;

pub use connection::{Connection, DEFAULT_DISPLAY_NAME};
pub use delivery::{DeliveryOutcome, DeliverySummary};
pub use errors::{BroadcastError, DeliveryError, DeliveryErrorKind, Result};
pub use message::BroadcastMessage;
