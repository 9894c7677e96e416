//! Scripted [`PushDelivery`] for tests.
//!
//! Each connection id can be given a fixed result and a delay. Calls are
//! recorded, and the peak number of concurrent deliveries is tracked so
//! tests can tell fan-out from serial delivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use janken_core::DeliveryError;
use parking_lot::Mutex;

use crate::client::PushDelivery;

/// In-memory push transport with per-target scripted behavior.
#[derive(Default)]
pub struct ScriptedPush {
    results: HashMap<String, DeliveryError>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    calls: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedPush {
    /// Every delivery succeeds immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: fail deliveries to `connection_id` with `error`.
    #[must_use]
    pub fn fail(mut self, connection_id: &str, error: DeliveryError) -> Self {
        let _ = self.results.insert(connection_id.to_string(), error);
        self
    }

    /// Builder: delay deliveries to `connection_id`.
    #[must_use]
    pub fn delay(mut self, connection_id: &str, delay: Duration) -> Self {
        let _ = self.delays.insert(connection_id.to_string(), delay);
        self
    }

    /// Builder: delay every delivery without a specific delay.
    #[must_use]
    pub fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// `(connection_id, payload)` for every call, in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    /// Connection ids called, sorted.
    pub fn called_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.calls.lock().iter().map(|(id, _)| id.clone()).collect();
        ids.sort();
        ids
    }

    /// Highest number of deliveries observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushDelivery for ScriptedPush {
    async fn deliver(&self, connection_id: &str, payload: &str) -> Result<(), DeliveryError> {
        self.calls
            .lock()
            .push((connection_id.to_string(), payload.to_string()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let delay = self
            .delays
            .get(connection_id)
            .copied()
            .unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match self.results.get(connection_id) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Decrements the in-flight count even when the delivery future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let _ = self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
