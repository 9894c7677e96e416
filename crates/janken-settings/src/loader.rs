//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`JankenSettings::default()`]
//! 2. If `~/.janken/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `JANKEN_*` environment variable overrides (highest priority)
//! 4. Validate the result

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{JankenSettings, RegistryBackend};

/// Resolve the service's home directory (`~/.janken`).
pub fn janken_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".janken")
}

/// Resolve the path to the settings file (`~/.janken/settings.json`).
pub fn settings_path() -> PathBuf {
    janken_dir().join("settings.json")
}

/// Resolve a possibly-relative data path under `~/.janken`.
pub fn resolve_data_path(path: &str) -> PathBuf {
    let p = PathBuf::from(path);
    if p.is_absolute() { p } else { janken_dir().join(p) }
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<JankenSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or the merged values fail validation, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<JankenSettings> {
    let defaults = serde_json::to_value(JankenSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: JankenSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Reject settings the service cannot run with.
pub fn validate(settings: &JankenSettings) -> Result<()> {
    let invalid = |field: &'static str, reason: &'static str| -> Result<()> {
        Err(SettingsError::Invalid { field, reason })
    };
    if settings.push.endpoint.trim().is_empty() {
        return invalid("push.endpoint", "is empty");
    }
    if settings.push.timeout_ms == 0 {
        return invalid("push.timeoutMs", "must be > 0");
    }
    if settings.fanout.deadline_ms == 0 {
        return invalid("fanout.deadlineMs", "must be > 0");
    }
    if settings.registry.backend == RegistryBackend::Sqlite && settings.registry.pool_size == 0 {
        return invalid("registry.poolSize", "must be > 0 for the sqlite backend");
    }
    Ok(())
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning (falling back to file/default).
pub fn apply_env_overrides(settings: &mut JankenSettings) {
    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = read_env_string("JANKEN_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("JANKEN_PORT", 1, 65535) {
        settings.server.port = v;
    }

    // ── Registry ────────────────────────────────────────────────────
    if let Some(v) = read_env_string("JANKEN_REGISTRY_BACKEND") {
        match parse_backend(&v) {
            Some(backend) => settings.registry.backend = backend,
            None => tracing::warn!(key = "JANKEN_REGISTRY_BACKEND", value = %v, "unknown registry backend, ignoring"),
        }
    }
    if let Some(v) = read_env_string("JANKEN_REGISTRY_PATH") {
        settings.registry.sqlite_path = v;
    }

    // ── Push ────────────────────────────────────────────────────────
    if let Some(v) = read_env_string("JANKEN_PUSH_ENDPOINT") {
        settings.push.endpoint = v;
    }
    if let Some(v) = read_env_string("JANKEN_PUSH_STAGE") {
        settings.push.stage = Some(v);
    }
    if let Some(v) = read_env_string("JANKEN_PUSH_TOKEN") {
        settings.push.auth_token = Some(v);
    }
    if let Some(v) = read_env_u64("JANKEN_PUSH_TIMEOUT_MS", 100, 600_000) {
        settings.push.timeout_ms = v;
    }

    // ── Fan-out ─────────────────────────────────────────────────────
    if let Some(v) = read_env_u64("JANKEN_FANOUT_DEADLINE_MS", 100, 900_000) {
        settings.fanout.deadline_ms = v;
    }
    if let Some(v) = read_env_usize("JANKEN_FANOUT_MAX_IN_FLIGHT", 0, 100_000) {
        settings.fanout.max_in_flight = v;
    }
    if let Some(v) = read_env_bool("JANKEN_CLEANUP_STALE") {
        settings.fanout.cleanup_stale_connections = v;
    }

    // ── Matchmaking / logging ───────────────────────────────────────
    if let Some(v) = read_env_string("JANKEN_DEFAULT_NAME") {
        settings.matchmaking.default_display_name = v;
    }
    if let Some(v) = read_env_string("JANKEN_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_bool("JANKEN_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a registry backend name.
pub fn parse_backend(val: &str) -> Option<RegistryBackend> {
    match val.to_lowercase().as_str() {
        "memory" => Some(RegistryBackend::Memory),
        "sqlite" => Some(RegistryBackend::Sqlite),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Tests that mutate `JANKEN_*` variables must hold this lock.
    static ENV_MUTEX: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

    /// SAFETY: env mutation is serialized by `ENV_MUTEX`, and these keys are
    /// not asserted on by the other tests in this binary.
    fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    #[test]
    fn deep_merge_nested_objects() {
        let target = json!({"fanout": {"deadlineMs": 25000, "maxInFlight": 0}});
        let source = json!({"fanout": {"maxInFlight": 8}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["fanout"]["deadlineMs"], 25000);
        assert_eq!(merged["fanout"]["maxInFlight"], 8);
    }

    #[test]
    fn deep_merge_skips_nulls() {
        let merged = deep_merge(json!({"a": 1}), json!({"a": null}));
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn deep_merge_replaces_arrays() {
        let merged = deep_merge(json!({"a": [1, 2, 3]}), json!({"a": [4]}));
        assert_eq!(merged["a"], json!([4]));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from_path(&dir.path().join("nope.json")).unwrap();
        assert_eq!(s.server.port, JankenSettings::default().server.port);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"registry": {"backend": "memory"}, "push": {"stage": "prod"}}"#,
        )
        .unwrap();
        let s = load_settings_from_path(&path).unwrap();
        assert_eq!(s.registry.backend, RegistryBackend::Memory);
        assert_eq!(s.push.stage.as_deref(), Some("prod"));
        assert_eq!(s.push.timeout_ms, 5_000);
    }

    #[test]
    fn invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_settings_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { path: ref p, .. } if *p == path));
    }

    #[test]
    fn zero_deadline_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"fanout": {"deadlineMs": 0}}"#).unwrap();
        let err = load_settings_from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid {
                field: "fanout.deadlineMs",
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_empty_endpoint() {
        let mut s = JankenSettings::default();
        s.push.endpoint = "  ".into();
        assert!(validate(&s).is_err());
    }

    #[test]
    fn validate_allows_zero_pool_for_memory_backend() {
        let mut s = JankenSettings::default();
        s.registry.backend = RegistryBackend::Memory;
        s.registry.pool_size = 0;
        assert!(validate(&s).is_ok());
    }

    #[test]
    fn parse_bool_variants() {
        for v in ["true", "1", "YES", "on"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["false", "0", "No", "OFF"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_backend_variants() {
        assert_eq!(parse_backend("Memory"), Some(RegistryBackend::Memory));
        assert_eq!(parse_backend("sqlite"), Some(RegistryBackend::Sqlite));
        assert_eq!(parse_backend("dynamo"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("8080", 1, 65535), Some(8080));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u64_range("50", 100, 1000), None);
        assert_eq!(parse_usize_range("0", 0, 10), Some(0));
        assert_eq!(parse_usize_range("x", 0, 10), None);
    }

    #[test]
    fn resolve_absolute_path_unchanged() {
        assert_eq!(resolve_data_path("/var/db.sqlite"), PathBuf::from("/var/db.sqlite"));
    }

    #[test]
    fn resolve_relative_path_under_home() {
        assert!(resolve_data_path("connections.db").ends_with(".janken/connections.db"));
    }

    #[test]
    fn env_overrides_win_over_file() {
        let _lock = ENV_MUTEX.lock();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"fanout": {"maxInFlight": 4}, "matchmaking": {"defaultDisplayName": "FromFile"}, "push": {"authToken": "file-token"}}"#,
        )
        .unwrap();

        set_env("JANKEN_FANOUT_MAX_IN_FLIGHT", "16");
        set_env("JANKEN_DEFAULT_NAME", "FromEnv");
        set_env("JANKEN_PUSH_TOKEN", "env-token");
        let s = load_settings_from_path(&path);
        remove_env("JANKEN_FANOUT_MAX_IN_FLIGHT");
        remove_env("JANKEN_DEFAULT_NAME");
        remove_env("JANKEN_PUSH_TOKEN");

        let s = s.unwrap();
        assert_eq!(s.fanout.max_in_flight, 16);
        assert_eq!(s.matchmaking.default_display_name, "FromEnv");
        assert_eq!(s.push.auth_token.as_deref(), Some("env-token"));
    }

    #[test]
    fn invalid_env_value_keeps_file_value() {
        let _lock = ENV_MUTEX.lock();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"fanout": {"maxInFlight": 4}}"#).unwrap();

        set_env("JANKEN_FANOUT_MAX_IN_FLIGHT", "lots");
        let s = load_settings_from_path(&path);
        remove_env("JANKEN_FANOUT_MAX_IN_FLIGHT");

        assert_eq!(s.unwrap().fanout.max_in_flight, 4);
    }
}
