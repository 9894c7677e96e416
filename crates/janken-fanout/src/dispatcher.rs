//! Concurrent delivery of one message to a set of connections.
//!
//! Every target gets its own delivery future; all of them are joined before
//! the summary is built. A failure on one target never cancels another. The
//! only invocation-fatal outcome is `Unauthorized`: once seen, deliveries
//! that have not started yet are skipped and recorded as abandoned, while
//! those already in flight drain normally.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use janken_core::{
    BroadcastError, BroadcastMessage, Connection, DeliveryError, DeliveryErrorKind,
    DeliveryOutcome, DeliverySummary, Result,
};
use janken_push::PushDelivery;
use metrics::{counter, histogram};
use tokio::sync::Semaphore;
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::metrics::{BROADCAST_DURATION_SECONDS, PUSH_DELIVERIES_TOTAL};

/// Default invocation budget.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(25);

/// Dispatcher tuning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Time budget for one broadcast. Deliveries still pending when it
    /// elapses are abandoned.
    pub deadline: Duration,
    /// Maximum concurrent deliveries. `0` means unbounded.
    pub max_in_flight: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_DEADLINE,
            max_in_flight: 0,
        }
    }
}

/// Fans a message out to many connections through a [`PushDelivery`].
pub struct FanoutDispatcher {
    push: Arc<dyn PushDelivery>,
    config: DispatchConfig,
}

impl FanoutDispatcher {
    /// Create a dispatcher over the given transport.
    pub fn new(push: Arc<dyn PushDelivery>, config: DispatchConfig) -> Self {
        Self { push, config }
    }

    /// Current configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Deliver `message` to every target, using the configured deadline.
    pub async fn broadcast(
        &self,
        message: &BroadcastMessage,
        targets: &[Connection],
    ) -> Result<DeliverySummary> {
        let deadline = Instant::now() + self.config.deadline;
        self.broadcast_until(message, targets, deadline).await
    }

    /// Deliver `message` to every target, abandoning anything unfinished at
    /// `deadline`.
    ///
    /// Returns the summary unless some target reported `Unauthorized`, in
    /// which case the first such target is surfaced as
    /// [`BroadcastError::Unauthorized`].
    pub async fn broadcast_until(
        &self,
        message: &BroadcastMessage,
        targets: &[Connection],
        deadline: Instant,
    ) -> Result<DeliverySummary> {
        let payload: Arc<str> = Arc::from(message.to_wire()?);
        let limiter = (self.config.max_in_flight > 0)
            .then(|| Semaphore::new(self.config.max_in_flight));
        let halt = CancellationToken::new();
        let started = Instant::now();

        let futures: Vec<_> = targets
            .iter()
            .map(|target| {
                self.deliver_one(&target.id, &payload, limiter.as_ref(), &halt, deadline)
            })
            .collect();
        let outcomes = join_all(futures).await;

        let elapsed = started.elapsed();
        histogram!(BROADCAST_DURATION_SECONDS).record(elapsed.as_secs_f64());

        let summary = DeliverySummary::from_outcomes(outcomes);

        if let Some(rejected) = summary
            .outcomes
            .iter()
            .find(|o| o.kind == Some(DeliveryErrorKind::Unauthorized))
        {
            error!(
                connection_id = %rejected.connection_id,
                kind = message.kind(),
                success = summary.success,
                failed = summary.failure_count(),
                "push transport rejected credentials; failing broadcast"
            );
            return Err(BroadcastError::Unauthorized {
                connection_id: rejected.connection_id.clone(),
                reason: rejected.error.clone().unwrap_or_default(),
            });
        }

        info!(
            kind = message.kind(),
            targets = summary.total(),
            success = summary.success,
            failed = summary.failure_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "broadcast complete"
        );
        Ok(summary)
    }

    async fn deliver_one(
        &self,
        connection_id: &str,
        payload: &str,
        limiter: Option<&Semaphore>,
        halt: &CancellationToken,
        deadline: Instant,
    ) -> DeliveryOutcome {
        let result = self
            .attempt(connection_id, payload, limiter, halt, deadline)
            .await;

        let label = match &result {
            Ok(()) => "success",
            Err(e) => e.kind.as_str(),
        };
        counter!(PUSH_DELIVERIES_TOTAL, "outcome" => label).increment(1);

        match &result {
            Ok(()) => debug!(connection_id, "delivered"),
            Err(e) if e.kind.is_fatal() => {
                halt.cancel();
                warn!(connection_id, error = %e, "delivery rejected");
            }
            Err(e) => warn!(connection_id, kind = %e.kind, reason = %e.reason, "delivery failed"),
        }

        DeliveryOutcome::from_result(connection_id, &result)
    }

    async fn attempt(
        &self,
        connection_id: &str,
        payload: &str,
        limiter: Option<&Semaphore>,
        halt: &CancellationToken,
        deadline: Instant,
    ) -> std::result::Result<(), DeliveryError> {
        let _permit = match limiter {
            Some(sem) => match timeout_at(deadline, sem.acquire()).await {
                Ok(Ok(permit)) => Some(permit),
                Ok(Err(_)) => return Err(DeliveryError::abandoned("delivery limiter closed")),
                Err(_) => {
                    return Err(DeliveryError::abandoned(
                        "deadline elapsed before delivery started",
                    ));
                }
            },
            None => None,
        };

        if halt.is_cancelled() {
            return Err(DeliveryError::abandoned(
                "skipped after push credentials were rejected",
            ));
        }

        match timeout_at(deadline, self.push.deliver(connection_id, payload)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::abandoned("deadline elapsed during delivery")),
        }
    }
}
