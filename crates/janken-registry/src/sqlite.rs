//! `SQLite`-backed registry.
//!
//! Rows live in a single `connections` table keyed by connection id.
//! Every call takes a pooled connection on the blocking thread pool.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use janken_core::Connection;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::debug;

use crate::errors::{RegistryError, Result};
use crate::registry::ConnectionRegistry;

/// Alias for the connection pool type.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS connections (
    id TEXT PRIMARY KEY,
    display_name TEXT,
    connected_at TEXT NOT NULL
);";

/// Pool configuration.
#[derive(Clone, Debug)]
pub struct SqliteConfig {
    /// Maximum pool size (default: 4).
    pub pool_size: u32,
    /// Busy timeout in milliseconds (default: 5000).
    pub busy_timeout_ms: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<rusqlite::Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut rusqlite::Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;\
             PRAGMA busy_timeout = {};\
             PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms
        ))
    }
}

/// Registry stored in a `SQLite` database file.
#[derive(Clone)]
pub struct SqliteRegistry {
    pool: ConnectionPool,
}

impl std::fmt::Debug for SqliteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRegistry")
            .field("pool_state", &self.pool.state())
            .finish()
    }
}

impl SqliteRegistry {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub fn open(path: &Path, config: &SqliteConfig) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| RegistryError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_secs(5))
            .connection_customizer(Box::new(PragmaCustomizer {
                busy_timeout_ms: config.busy_timeout_ms,
            }))
            .build(manager)?;
        pool.get()?.execute_batch(SCHEMA)?;
        debug!(path = %path.display(), pool_size = config.pool_size, "connection registry opened");
        Ok(Self { pool })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await?
    }
}

#[async_trait]
impl ConnectionRegistry for SqliteRegistry {
    async fn list_connections(&self) -> Result<Vec<Connection>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, display_name FROM connections ORDER BY connected_at, rowid",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(Connection {
                    id: row.get(0)?,
                    display_name: row.get(1)?,
                })
            })?;
            Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn register(&self, connection: Connection) -> Result<()> {
        let connected_at = chrono::Utc::now().to_rfc3339();
        self.with_conn(move |conn| {
            let _ = conn.execute(
                "INSERT INTO connections (id, display_name, connected_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name",
                rusqlite::params![connection.id, connection.display_name, connected_at],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, connection_id: &str) -> Result<bool> {
        let id = connection_id.to_string();
        self.with_conn(move |conn| {
            let deleted = conn.execute("DELETE FROM connections WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
        .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
