//! Single-target push delivery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use janken_core::DeliveryError;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, warn};

use crate::classify::{classify_status, classify_transport_error};
use crate::session::SessionCache;

/// Bytes escaped in the connection-id path segment: everything except RFC 3986 unreserved.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Sends one serialized payload to one connection.
#[async_trait]
pub trait PushDelivery: Send + Sync {
    /// Deliver `payload` (already JSON text) to `connection_id`.
    ///
    /// Never retries. The error kind tells the caller whether the peer is
    /// gone, the network failed, or the credentials were refused.
    async fn deliver(&self, connection_id: &str, payload: &str) -> Result<(), DeliveryError>;
}

/// Push transport settings.
#[derive(Clone, Debug)]
pub struct PushConfig {
    /// HTTP base URL; requests go to `{base_url}/@connections/{id}`.
    pub base_url: String,
    /// Optional bearer credential.
    pub auth_token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// `reqwest`-backed [`PushDelivery`].
pub struct HttpPushClient {
    base_url: String,
    auth_token: Option<String>,
    session: Arc<SessionCache>,
}

impl std::fmt::Debug for HttpPushClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPushClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.auth_token.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpPushClient {
    /// Build a client with its own session cache.
    pub fn new(config: PushConfig) -> Self {
        let session = SessionCache::new(config.timeout);
        Self::with_session(config, session)
    }

    /// Build a client over an existing shared session cache.
    pub fn with_session(config: PushConfig, session: Arc<SessionCache>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token,
            session,
        }
    }

    /// The shared session cache.
    pub fn session(&self) -> &Arc<SessionCache> {
        &self.session
    }

    /// Target URL for one connection. The id is percent-encoded as a single
    /// path segment, so `/`, `?` and `#` cannot redirect the request.
    pub fn connection_url(&self, connection_id: &str) -> String {
        format!(
            "{}/@connections/{}",
            self.base_url,
            utf8_percent_encode(connection_id, SEGMENT)
        )
    }
}

#[async_trait]
impl PushDelivery for HttpPushClient {
    async fn deliver(&self, connection_id: &str, payload: &str) -> Result<(), DeliveryError> {
        let lease = self
            .session
            .acquire()
            .map_err(|e| DeliveryError::transient(format!("push session unavailable: {e}")))?;

        let url = self.connection_url(connection_id);
        let mut request = lease
            .client()
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_string());
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    debug!(connection_id, status = status.as_u16(), "push delivered");
                    return Ok(());
                }
                let body = response.text().await.unwrap_or_default();
                let result = classify_status(status, &body);
                if let Err(e) = &result {
                    warn!(
                        connection_id,
                        status = status.as_u16(),
                        kind = %e.kind,
                        body = %body,
                        "push rejected"
                    );
                }
                result
            }
            Err(e) => {
                warn!(connection_id, url = %url, error = %e, "push request failed (transport error)");
                Err(classify_transport_error(&e))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
