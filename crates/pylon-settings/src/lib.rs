//! # pylon-settings
//!
//! Configuration management with layered sources for the Pylon gateway.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`PylonSettings::default()`]
//! 2. **User file** — `~/.pylon/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `PYLON_*` overrides (highest priority)
//!
//! The global accessor is a convenience for the binary; components take
//! their settings by value so tests construct them directly.
//!
//! # Usage
//!
//! ```no_run
//! use pylon_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("broker: {}:{}", settings.broker.host, settings.broker.port);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::path::Path;
use std::sync::{Arc, RwLock};

/// Global settings singleton.
///
/// Uses `RwLock<Option<Arc<PylonSettings>>>` instead of `OnceLock` so the
/// cached value can be swapped by [`reload_settings_from_path`]. Reads are
/// cheap (shared lock + `Arc::clone`); writes only happen on reload.
static SETTINGS: RwLock<Option<Arc<PylonSettings>>> = RwLock::new(None);

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.pylon/settings.json` with env var
/// overrides. On subsequent calls, returns the cached value. If loading
/// fails, returns compiled defaults.
///
/// Returns an `Arc` so callers hold a consistent snapshot even if another
/// thread reloads settings concurrently.
pub fn get_settings() -> Arc<PylonSettings> {
    // Fast path: read lock
    {
        let guard = SETTINGS.read().expect("settings lock poisoned");
        if let Some(ref s) = *guard {
            return Arc::clone(s);
        }
    }

    // Slow path: first access, take write lock
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    // Double-check after acquiring write lock (another thread may have initialized)
    if let Some(ref s) = *guard {
        return Arc::clone(s);
    }

    let settings = Arc::new(match load_settings() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            PylonSettings::default()
        }
    });
    *guard = Some(Arc::clone(&settings));
    settings
}

/// Initialize the global settings with a specific value.
///
/// Replaces any previously cached settings. Used by the gateway binary when
/// a `--settings` path is given, and by tests.
pub fn init_settings(settings: PylonSettings) {
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    *guard = Some(Arc::new(settings));
}

/// Reload settings from a specific file path.
///
/// Reads the file, deep-merges over defaults, applies env overrides, and
/// swaps the global cache so all subsequent [`get_settings`] calls return
/// the new values.
pub fn reload_settings_from_path(path: &Path) {
    let new = Arc::new(match load_settings_from_path(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, ?path, "failed to reload settings, falling back to defaults");
            PylonSettings::default()
        }
    });
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    *guard = Some(new);
    tracing::info!(?path, "settings reloaded from disk");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests that mutate the global SETTINGS static must hold this lock
    /// to avoid racing with each other (Rust runs tests in parallel threads).
    static SETTINGS_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn re_exports_work() {
        let _settings = PylonSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn init_then_get_returns_same_value() {
        let _guard = SETTINGS_MUTEX.lock().unwrap();

        let mut custom = PylonSettings::default();
        custom.name = "custom".to_string();
        init_settings(custom);

        let fetched = get_settings();
        assert_eq!(fetched.name, "custom");
    }

    #[test]
    fn reload_swaps_the_cached_value() {
        let _guard = SETTINGS_MUTEX.lock().unwrap();

        init_settings(PylonSettings::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"name": "reloaded"}"#).unwrap();

        reload_settings_from_path(&path);
        assert_eq!(get_settings().name, "reloaded");

        // Restore defaults for other tests.
        init_settings(PylonSettings::default());
    }

    #[test]
    fn reload_from_bad_path_falls_back_to_defaults() {
        let _guard = SETTINGS_MUTEX.lock().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ broken").unwrap();

        reload_settings_from_path(&path);
        assert_eq!(get_settings().name, "pylon");
    }
}
