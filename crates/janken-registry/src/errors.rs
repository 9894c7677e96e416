//! Registry error types.

use janken_core::BroadcastError;
use thiserror::Error;

/// Errors from a registry store.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The store rejected a query.
    #[error("registry storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    /// No pooled connection could be obtained.
    #[error("registry pool error: {0}")]
    Pool(#[from] r2d2::Error),
    /// The database directory could not be created.
    #[error("registry directory {path}: {source}")]
    Io {
        /// Directory that failed.
        path: std::path::PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The blocking worker panicked or was cancelled.
    #[error("registry worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

impl From<RegistryError> for BroadcastError {
    fn from(err: RegistryError) -> Self {
        BroadcastError::RegistryUnavailable {
            reason: err.to_string(),
        }
    }
}
