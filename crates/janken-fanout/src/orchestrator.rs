//! Per-request composition: snapshot → message → fan-out.

use std::sync::Arc;
use std::time::Duration;

use janken_core::matchmaking::evaluate_with_default;
use janken_core::{
    BroadcastError, BroadcastMessage, DEFAULT_DISPLAY_NAME, DeliveryErrorKind, DeliverySummary,
    Result,
};
use janken_registry::ConnectionRegistry;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use crate::cleanup::StaleCleanup;
use crate::dispatcher::FanoutDispatcher;
use crate::metrics::{BROADCAST_ERRORS_TOTAL, BROADCAST_REQUESTS_TOTAL};

/// Which message a broadcast request produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastMode {
    /// Forward the inbound `data` to everyone.
    Relay,
    /// Send `wait` or `start` depending on how many players are registered.
    Matchmaking,
}

impl BroadcastMode {
    /// Metric and log label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relay => "relay",
            Self::Matchmaking => "matchmaking",
        }
    }
}

/// Orchestrator policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Opponent name used when the registry row has none.
    pub default_display_name: String,
    /// Remove rows whose delivery came back stale.
    pub cleanup_stale: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_display_name: DEFAULT_DISPLAY_NAME.to_string(),
            cleanup_stale: false,
        }
    }
}

/// Entry point for one inbound broadcast event.
pub struct BroadcastOrchestrator {
    registry: Arc<dyn ConnectionRegistry>,
    dispatcher: FanoutDispatcher,
    cleanup: StaleCleanup,
    config: OrchestratorConfig,
}

impl BroadcastOrchestrator {
    /// Compose a registry and a dispatcher.
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        dispatcher: FanoutDispatcher,
        config: OrchestratorConfig,
    ) -> Self {
        let cleanup = StaleCleanup::new(Arc::clone(&registry));
        Self {
            registry,
            dispatcher,
            cleanup,
            config,
        }
    }

    /// The registry this orchestrator reads.
    pub fn registry(&self) -> &Arc<dyn ConnectionRegistry> {
        &self.registry
    }

    /// Current policy.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Handle one broadcast.
    ///
    /// Fails with `RegistryUnavailable` if the snapshot cannot be read,
    /// `NoConnections` if it is empty, and `Unauthorized` if the push
    /// transport rejects credentials. Every other per-target failure is
    /// reported inside the returned summary.
    #[tracing::instrument(skip_all, fields(connection_id = %triggering_id, mode = mode.as_str()))]
    pub async fn handle_broadcast_request(
        &self,
        triggering_id: &str,
        raw_payload: Value,
        mode: BroadcastMode,
    ) -> Result<DeliverySummary> {
        counter!(BROADCAST_REQUESTS_TOTAL, "mode" => mode.as_str()).increment(1);

        let result = self.run(triggering_id, raw_payload, mode).await;
        if let Err(e) = &result {
            counter!(BROADCAST_ERRORS_TOTAL, "error_type" => e.code()).increment(1);
        }
        result
    }

    /// Relay `data` from `triggering_id` to every registered connection.
    pub async fn relay(&self, triggering_id: &str, data: Value) -> Result<DeliverySummary> {
        self.handle_broadcast_request(triggering_id, data, BroadcastMode::Relay)
            .await
    }

    /// Run the matchmaking broadcast for `triggering_id`.
    pub async fn matchmake(&self, triggering_id: &str) -> Result<DeliverySummary> {
        self.handle_broadcast_request(triggering_id, Value::Null, BroadcastMode::Matchmaking)
            .await
    }

    /// Wait for background stale-row cleanups, up to `timeout`.
    pub async fn drain_cleanup(&self, timeout: Duration) -> bool {
        self.cleanup.drain_with_timeout(timeout).await
    }

    async fn run(
        &self,
        triggering_id: &str,
        raw_payload: Value,
        mode: BroadcastMode,
    ) -> Result<DeliverySummary> {
        let snapshot = self.registry.list_connections().await.map_err(|e| {
            error!(error = %e, "failed to read connection registry");
            BroadcastError::from(e)
        })?;

        if snapshot.is_empty() {
            warn!("broadcast requested with no registered connections");
            return Err(BroadcastError::NoConnections);
        }

        let message = match mode {
            BroadcastMode::Relay => BroadcastMessage::relay(raw_payload),
            BroadcastMode::Matchmaking => evaluate_with_default(
                &snapshot,
                triggering_id,
                &self.config.default_display_name,
            ),
        };

        let summary = self.dispatcher.broadcast(&message, &snapshot).await?;

        if self.config.cleanup_stale {
            let stale: Vec<String> = summary
                .failed_with(DeliveryErrorKind::StaleConnection)
                .into_iter()
                .map(str::to_string)
                .collect();
            self.cleanup.schedule(stale);
        }

        Ok(summary)
    }
}
