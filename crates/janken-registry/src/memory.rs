//! In-process registry.

use async_trait::async_trait;
use janken_core::Connection;
use parking_lot::RwLock;

use crate::errors::Result;
use crate::registry::ConnectionRegistry;

/// Registry rows held in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    rows: RwLock<Vec<Connection>>,
}

impl MemoryRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with rows.
    pub fn with_connections(rows: impl IntoIterator<Item = Connection>) -> Self {
        let registry = Self::new();
        for row in rows {
            registry.upsert(row);
        }
        registry
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Whether no rows are registered.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn upsert(&self, connection: Connection) {
        let mut rows = self.rows.write();
        if let Some(existing) = rows.iter_mut().find(|c| c.id == connection.id) {
            *existing = connection;
        } else {
            rows.push(connection);
        }
    }
}

#[async_trait]
impl ConnectionRegistry for MemoryRegistry {
    async fn list_connections(&self) -> Result<Vec<Connection>> {
        Ok(self.rows.read().clone())
    }

    async fn register(&self, connection: Connection) -> Result<()> {
        self.upsert(connection);
        Ok(())
    }

    async fn remove(&self, connection_id: &str) -> Result<bool> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|c| c.id != connection_id);
        Ok(rows.len() != before)
    }
}
