//! Delivery outcomes and the per-invocation summary.

use serde::{Deserialize, Serialize};

use crate::errors::{DeliveryError, DeliveryErrorKind};

/// Result of one push attempt to one connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    /// Target connection.
    pub connection_id: String,
    /// Whether the transport accepted the payload.
    pub succeeded: bool,
    /// Failure class, present iff `succeeded` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DeliveryErrorKind>,
    /// Failure detail, present iff `succeeded` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryOutcome {
    /// A successful delivery.
    pub fn success(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            succeeded: true,
            kind: None,
            error: None,
        }
    }

    /// A failed delivery.
    pub fn failure(connection_id: impl Into<String>, error: &DeliveryError) -> Self {
        Self {
            connection_id: connection_id.into(),
            succeeded: false,
            kind: Some(error.kind),
            error: Some(error.reason.clone()),
        }
    }

    /// Build from the push client's result.
    pub fn from_result(
        connection_id: impl Into<String>,
        result: &Result<(), DeliveryError>,
    ) -> Self {
        match result {
            Ok(()) => Self::success(connection_id),
            Err(e) => Self::failure(connection_id, e),
        }
    }
}

/// Aggregate of every outcome in one broadcast.
///
/// Serializes as `{"success": n, "failed": [ids], "outcomes": [...]}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySummary {
    /// Number of successful deliveries.
    pub success: usize,
    /// Ids whose delivery failed, in target order.
    pub failed: Vec<String>,
    /// Every outcome, in target order.
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DeliverySummary {
    /// Aggregate a list of outcomes.
    pub fn from_outcomes(outcomes: Vec<DeliveryOutcome>) -> Self {
        let success = outcomes.iter().filter(|o| o.succeeded).count();
        let failed = outcomes
            .iter()
            .filter(|o| !o.succeeded)
            .map(|o| o.connection_id.clone())
            .collect();
        Self {
            success,
            failed,
            outcomes,
        }
    }

    /// Total attempts recorded.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of failed deliveries.
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    /// Ids that failed with the given kind.
    pub fn failed_with(&self, kind: DeliveryErrorKind) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.kind == Some(kind))
            .map(|o| o.connection_id.as_str())
            .collect()
    }
}
