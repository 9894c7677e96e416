//! # janken-settings
//!
//! Layered configuration for the Janken Hockey fan-out service.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`JankenSettings::default()`]
//! 2. **User file**: `~/.janken/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `JANKEN_*` overrides (highest priority)
//!
//! The process-wide copy is cached behind [`get_settings`]; the server
//! binary seeds it once at startup with [`init_settings`].

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    deep_merge, janken_dir, load_settings, load_settings_from_path, resolve_data_path,
    settings_path, validate,
};
pub use types::*;

use std::sync::Arc;

use parking_lot::RwLock;

/// Global settings singleton.
static SETTINGS: RwLock<Option<Arc<JankenSettings>>> = RwLock::new(None);

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.janken/settings.json` with env var
/// overrides. If loading fails, returns compiled defaults.
pub fn get_settings() -> Arc<JankenSettings> {
    {
        let guard = SETTINGS.read();
        if let Some(ref s) = *guard {
            return Arc::clone(s);
        }
    }

    let mut guard = SETTINGS.write();
    // Another thread may have initialized while we waited for the write lock.
    if let Some(ref s) = *guard {
        return Arc::clone(s);
    }

    let settings = Arc::new(match load_settings() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            JankenSettings::default()
        }
    });
    *guard = Some(Arc::clone(&settings));
    settings
}

/// Replace the global settings with a specific value.
pub fn init_settings(settings: JankenSettings) -> Arc<JankenSettings> {
    let settings = Arc::new(settings);
    *SETTINGS.write() = Some(Arc::clone(&settings));
    settings
}

#[cfg(test)]
pub(crate) fn reset_settings() {
    *SETTINGS.write() = None;
}
