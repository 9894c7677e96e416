//! Process-wide HTTP session shared across broadcast invocations.
//!
//! The `reqwest::Client` is built on first [`SessionCache::acquire`] and
//! reused afterwards. Every user holds a [`SessionLease`] for the duration
//! of its deliveries. [`SessionCache::close`] drops the client immediately
//! when no lease is outstanding, otherwise the last lease to be released
//! drops it.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

#[derive(Default)]
struct CacheState {
    client: Option<reqwest::Client>,
    leases: usize,
    closing: bool,
    builds: u64,
}

/// Lazily built, lease-counted HTTP client.
pub struct SessionCache {
    timeout: Duration,
    state: Mutex<CacheState>,
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SessionCache")
            .field("timeout", &self.timeout)
            .field("initialized", &state.client.is_some())
            .field("leases", &state.leases)
            .field("closing", &state.closing)
            .finish()
    }
}

impl SessionCache {
    /// A cache whose client applies `timeout` to every request.
    pub fn new(timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            timeout,
            state: Mutex::new(CacheState::default()),
        })
    }

    /// Borrow the shared client, building it on first use.
    ///
    /// Concurrent first calls build exactly one client. Acquiring after
    /// [`close`](Self::close) cancels a pending teardown or rebuilds.
    pub fn acquire(self: &Arc<Self>) -> Result<SessionLease, reqwest::Error> {
        let mut state = self.state.lock();
        let client = match &state.client {
            Some(client) => client.clone(),
            None => {
                let client = reqwest::Client::builder().timeout(self.timeout).build()?;
                state.builds += 1;
                info!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    generation = state.builds,
                    "push session created"
                );
                state.client = Some(client.clone());
                client
            }
        };
        state.leases += 1;
        state.closing = false;
        Ok(SessionLease {
            client,
            cache: Arc::clone(self),
        })
    }

    /// Request teardown once no lease is outstanding.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.leases == 0 {
            if state.client.take().is_some() {
                info!("push session closed");
            }
            state.closing = false;
        } else {
            debug!(leases = state.leases, "push session close deferred");
            state.closing = true;
        }
    }

    /// Whether a client is currently cached.
    pub fn is_initialized(&self) -> bool {
        self.state.lock().client.is_some()
    }

    /// Number of outstanding leases.
    pub fn active_leases(&self) -> usize {
        self.state.lock().leases
    }

    /// How many clients have been built over the cache's lifetime.
    pub fn builds(&self) -> u64 {
        self.state.lock().builds
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.leases = state.leases.saturating_sub(1);
        if state.leases == 0 && state.closing {
            state.client = None;
            state.closing = false;
            info!("push session closed after last lease released");
        }
    }
}

/// Scoped hold on the shared client. Releases on drop.
pub struct SessionLease {
    client: reqwest::Client,
    cache: Arc<SessionCache>,
}

impl SessionLease {
    /// The shared client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.cache.release();
    }
}
