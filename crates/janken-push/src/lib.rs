//! # janken-push
//!
//! Sends one serialized payload to one connection through the
//! addressable push endpoint (`POST {base}/@connections/{id}`).
//!
//! - [`PushDelivery`]: the single-target send contract
//! - [`HttpPushClient`]: `reqwest` implementation with status classification
//! - [`SessionCache`]: process-wide HTTP client shared under scoped leases
//!
//! The client never retries. It reports a [`DeliveryErrorKind`] so callers
//! can tell a closed peer from a network blip from bad credentials.
//!
//! [`DeliveryErrorKind`]: janken_core::DeliveryErrorKind

#![deny(unsafe_code)]

pub mod classify;
pub mod client;
pub mod session;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use classify::{classify_status, classify_transport_error};
pub use client::{HttpPushClient, PushConfig, PushDelivery};
pub use session::{SessionCache, SessionLease};
