//! Best-effort removal of stale registry rows.
//!
//! When enabled, connections whose delivery came back as
//! `StaleConnection` are removed from the registry on a background task.
//! The broadcast never waits on it and a failed removal is only logged;
//! the disconnect path remains the primary way rows go away.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use janken_registry::ConnectionRegistry;
use metrics::counter;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::metrics::REGISTRY_CLEANUPS_TOTAL;

/// Tracks background registry cleanups so shutdown can wait for them.
pub struct StaleCleanup {
    registry: Arc<dyn ConnectionRegistry>,
    tasks: TaskTracker,
    pending: Arc<AtomicUsize>,
}

impl StaleCleanup {
    /// Create a cleanup tracker over `registry`.
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self {
            registry,
            tasks: TaskTracker::new(),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Spawn removal of `connection_ids`. Returns immediately.
    pub fn schedule(&self, connection_ids: Vec<String>) {
        if connection_ids.is_empty() {
            return;
        }

        let registry = Arc::clone(&self.registry);
        let pending = Arc::clone(&self.pending);
        let _ = pending.fetch_add(1, Ordering::Relaxed);

        drop(self.tasks.spawn(async move {
            for id in connection_ids {
                let status = match registry.remove(&id).await {
                    Ok(true) => {
                        debug!(connection_id = %id, "removed stale connection");
                        "removed"
                    }
                    Ok(false) => "missing",
                    Err(e) => {
                        warn!(connection_id = %id, error = %e, "stale connection cleanup failed");
                        "failed"
                    }
                };
                counter!(REGISTRY_CLEANUPS_TOTAL, "status" => status).increment(1);
            }
            let _ = pending.fetch_sub(1, Ordering::Relaxed);
        }));
    }

    /// Wait for every scheduled cleanup, up to `timeout`.
    ///
    /// Returns `true` if all finished in time.
    pub async fn drain_with_timeout(&self, timeout: Duration) -> bool {
        let _ = self.tasks.close();
        let done = tokio::time::timeout(timeout, self.tasks.wait())
            .await
            .is_ok();
        let _ = self.tasks.reopen();
        if !done {
            info!(pending = self.pending_count(), "stale cleanup still running at drain timeout");
        }
        done
    }

    /// Number of cleanup batches not yet finished.
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for StaleCleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaleCleanup")
            .field("pending_count", &self.pending_count())
            .finish_non_exhaustive()
    }
}
