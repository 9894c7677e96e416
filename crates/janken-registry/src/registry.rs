//! Connection registry trait.

use async_trait::async_trait;
use janken_core::Connection;

use crate::errors::Result;

/// Access to the set of live connections.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Every currently registered connection.
    ///
    /// Read-only. Returns an empty list (not an error) when nothing is
    /// registered. Order is not part of the contract.
    async fn list_connections(&self) -> Result<Vec<Connection>>;

    /// Insert or replace a row. Called when a client connects.
    async fn register(&self, connection: Connection) -> Result<()>;

    /// Delete a row. Returns whether it existed.
    async fn remove(&self, connection_id: &str) -> Result<bool>;
}
