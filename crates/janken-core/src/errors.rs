//! Per-target and invocation-level error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failed push to one connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryErrorKind {
    /// The connection closed after the registry was read.
    StaleConnection,
    /// Timeout, connection reset, or a 5xx from the transport.
    TransientNetwork,
    /// The service's push credentials were rejected.
    Unauthorized,
    /// Cut off by the invocation deadline, or never issued after an
    /// `Unauthorized` result was seen.
    Abandoned,
}

impl DeliveryErrorKind {
    /// Whether a later invocation may succeed by retrying.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::TransientNetwork)
    }

    /// Whether this failure fails the whole invocation.
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StaleConnection => "stale_connection",
            Self::TransientNetwork => "transient_network",
            Self::Unauthorized => "unauthorized",
            Self::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for DeliveryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed push to one connection.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}: {reason}")]
pub struct DeliveryError {
    /// Failure class.
    pub kind: DeliveryErrorKind,
    /// Human-readable detail (status line, transport error text).
    pub reason: String,
}

impl DeliveryError {
    /// Build an error of the given kind.
    pub fn new(kind: DeliveryErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    /// Target no longer exists at the transport.
    pub fn stale(reason: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::StaleConnection, reason)
    }

    /// Retryable transport failure.
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::TransientNetwork, reason)
    }

    /// Credentials rejected.
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::Unauthorized, reason)
    }

    /// Not completed within this invocation.
    pub fn abandoned(reason: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::Abandoned, reason)
    }
}

/// Failures that end a broadcast invocation.
///
/// Per-target failures other than `Unauthorized` never appear here; they
/// are carried as data in the [`DeliverySummary`](crate::DeliverySummary).
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The registry could not be read. Nothing was sent.
    #[error("connection registry unavailable: {reason}")]
    RegistryUnavailable {
        /// Underlying storage error.
        reason: String,
    },
    /// The registry is empty. Nothing to deliver to.
    #[error("no connections registered")]
    NoConnections,
    /// The transport rejected the service's credentials.
    #[error("push transport rejected credentials (connection {connection_id}): {reason}")]
    Unauthorized {
        /// Target whose delivery surfaced the rejection.
        connection_id: String,
        /// Transport response detail.
        reason: String,
    },
    /// The message could not be encoded.
    #[error("failed to serialize broadcast message: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BroadcastError {
    /// Stable label for logs, metrics, and response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RegistryUnavailable { .. } => "registry_unavailable",
            Self::NoConnections => "no_connections",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Result type for broadcast operations.
pub type Result<T> = std::result::Result<T, BroadcastError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
