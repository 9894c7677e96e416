//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a settings file may contain any subset of fields.

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9090 },
///   "push": { "endpoint": "wss://abc.example.com", "stage": "prod" },
///   "fanout": { "cleanupStaleConnections": true }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JankenSettings {
    /// HTTP shell bind settings.
    pub server: ServerSettings,
    /// Connection registry backend.
    pub registry: RegistrySettings,
    /// Push transport.
    pub push: PushSettings,
    /// Fan-out behavior.
    pub fanout: FanoutSettings,
    /// Matchmaking behavior.
    pub matchmaking: MatchmakingSettings,
    /// Logging output.
    pub logging: LoggingSettings,
}

/// HTTP shell bind settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// How long shutdown waits for in-flight broadcasts, in milliseconds.
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_ms: 10_000,
        }
    }
}

/// Which registry store backs the connection rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    /// In-process rows; lost on restart.
    Memory,
    /// `SQLite` table.
    #[default]
    Sqlite,
}

/// Connection registry settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrySettings {
    /// Store backend.
    pub backend: RegistryBackend,
    /// Database path. Relative paths resolve under `~/.janken`.
    pub sqlite_path: String,
    /// Maximum pooled `SQLite` connections.
    pub pool_size: u32,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            backend: RegistryBackend::Sqlite,
            sqlite_path: "connections.db".to_string(),
            pool_size: 4,
        }
    }
}

/// Push transport settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PushSettings {
    /// Management endpoint. A `wss://` or `ws://` scheme is accepted and
    /// rewritten to its HTTP equivalent.
    pub endpoint: String,
    /// Optional deployment stage appended as a path segment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Optional bearer credential sent on every push.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9001".to_string(),
            stage: None,
            auth_token: None,
            timeout_ms: 5_000,
        }
    }
}

impl PushSettings {
    /// HTTP base URL for `@connections/{id}` requests.
    ///
    /// Strips trailing slashes and appends the stage, if any.
    pub fn base_url(&self) -> String {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        let mut url = if let Some(rest) = endpoint.strip_prefix("wss://") {
            format!("https://{rest}")
        } else if let Some(rest) = endpoint.strip_prefix("ws://") {
            format!("http://{rest}")
        } else if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("https://{endpoint}")
        };
        if let Some(stage) = self.stage.as_deref().map(|s| s.trim_matches('/')) {
            if !stage.is_empty() {
                url.push('/');
                url.push_str(stage);
            }
        }
        url
    }
}

/// Fan-out behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FanoutSettings {
    /// Invocation budget in milliseconds. Deliveries still pending when it
    /// elapses are recorded as abandoned.
    pub deadline_ms: u64,
    /// Maximum concurrent deliveries per invocation; `0` means unbounded.
    pub max_in_flight: usize,
    /// Delete a registry row after its delivery reports a stale connection.
    pub cleanup_stale_connections: bool,
}

impl Default for FanoutSettings {
    fn default() -> Self {
        Self {
            deadline_ms: 25_000,
            max_in_flight: 0,
            cleanup_stale_connections: false,
        }
    }
}

/// Matchmaking behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchmakingSettings {
    /// Name sent as `opponent` when the opponent's row has none.
    pub default_display_name: String,
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            default_display_name: "Guest".to_string(),
        }
    }
}

/// Logging output.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
