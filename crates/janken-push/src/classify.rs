//! Map transport responses to delivery results.

use janken_core::DeliveryError;
use reqwest::StatusCode;

/// Classify an HTTP response status.
///
/// | Status | Result |
/// |--------|--------|
/// | 2xx | `Ok` |
/// | 410 | `StaleConnection` |
/// | 401, 403 | `Unauthorized` |
/// | anything else | `TransientNetwork` |
///
/// 404 stays transient: a misconfigured endpoint answers 404 for every
/// target, and treating that as stale would empty the registry.
pub fn classify_status(status: StatusCode, body: &str) -> Result<(), DeliveryError> {
    if status.is_success() {
        return Ok(());
    }
    let reason = if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };
    match status {
        StatusCode::GONE => Err(DeliveryError::stale(reason)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(DeliveryError::unauthorized(reason))
        }
        _ => Err(DeliveryError::transient(reason)),
    }
}

/// Classify a request that never produced a response.
pub fn classify_transport_error(err: &reqwest::Error) -> DeliveryError {
    if err.is_timeout() {
        DeliveryError::transient(format!("timed out: {err}"))
    } else if err.is_connect() {
        DeliveryError::transient(format!("connect failed: {err}"))
    } else {
        DeliveryError::transient(err.to_string())
    }
}
