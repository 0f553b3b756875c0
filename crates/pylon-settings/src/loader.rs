//! Settings loading: defaults, file overlay, environment overrides.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::errors::Result;
use crate::types::PylonSettings;

/// Path of the user settings file: `~/.pylon/settings.json`.
pub fn settings_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pylon")
        .join("settings.json")
}

/// Recursively merge `overlay` onto `base`.
///
/// Objects merge key-by-key; any other value in `overlay` (including arrays
/// and `null`) replaces the base value wholesale.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Load settings from the default path with env overrides applied.
pub fn load_settings() -> Result<PylonSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific file path.
///
/// A missing file is not an error — compiled defaults are used. A present
/// but unreadable or malformed file is an error, so a typo in the settings
/// file is surfaced instead of silently ignored.
pub fn load_settings_from_path(path: &Path) -> Result<PylonSettings> {
    let defaults = serde_json::to_value(PylonSettings::default())?;

    let merged = if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        let overlay: Value = serde_json::from_str(&raw)?;
        deep_merge(defaults, overlay)
    } else {
        defaults
    };

    let mut settings: PylonSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.validate();
    Ok(settings)
}

/// Apply `PYLON_*` environment overrides through an injectable lookup.
///
/// The lookup indirection keeps this testable without mutating process
/// environment (which is unsafe to do from parallel tests).
pub fn apply_env_overrides(
    settings: &mut PylonSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(host) = lookup("PYLON_BROKER_HOST") {
        settings.broker.host = host;
    }
    if let Some(port) = lookup("PYLON_BROKER_PORT") {
        match port.parse::<u16>() {
            Ok(port) => settings.broker.port = port,
            Err(_) => tracing::warn!(value = %port, "PYLON_BROKER_PORT is not a valid port, ignored"),
        }
    }
    if let Some(username) = lookup("PYLON_BROKER_USERNAME") {
        settings.broker.username = username;
    }
    if let Some(password) = lookup("PYLON_BROKER_PASSWORD") {
        settings.broker.password = password;
    }
    if let Some(host) = lookup("PYLON_SERVER_HOST") {
        settings.server.host = host;
    }
    if let Some(port) = lookup("PYLON_SERVER_PORT") {
        match port.parse::<u16>() {
            Ok(port) => settings.server.port = port,
            Err(_) => tracing::warn!(value = %port, "PYLON_SERVER_PORT is not a valid port, ignored"),
        }
    }
    if let Some(level) = lookup("PYLON_LOG_LEVEL") {
        settings.logging.level = level;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn deep_merge_nested_objects() {
        let base = serde_json::json!({"broker": {"host": "localhost", "port": 1883}});
        let overlay = serde_json::json!({"broker": {"host": "mqtt.internal"}});
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["broker"]["host"], "mqtt.internal");
        assert_eq!(merged["broker"]["port"], 1883);
    }

    #[test]
    fn deep_merge_overlay_replaces_scalars_and_arrays() {
        let base = serde_json::json!({"list": [1, 2, 3], "x": 1});
        let overlay = serde_json::json!({"list": [9], "x": 2});
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["list"], serde_json::json!([9]));
        assert_eq!(merged["x"], 2);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from_path(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings.broker.host, "localhost");
        assert_eq!(settings.server.port, 8000);
    }

    #[test]
    fn file_overlay_wins_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"broker": {"port": 8883}, "name": "edge"}"#).unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.broker.port, 8883);
        assert_eq!(settings.name, "edge");
        // Untouched fields keep their defaults
        assert_eq!(settings.broker.host, "localhost");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_settings_from_path(&path).is_err());
    }

    #[test]
    fn env_overrides_take_priority() {
        let vars = env(&[
            ("PYLON_BROKER_HOST", "broker.prod"),
            ("PYLON_BROKER_PORT", "8883"),
            ("PYLON_BROKER_USERNAME", "svc"),
            ("PYLON_BROKER_PASSWORD", "hunter2"),
            ("PYLON_LOG_LEVEL", "debug"),
        ]);
        let mut settings = PylonSettings::default();
        apply_env_overrides(&mut settings, |name| vars.get(name).cloned());

        assert_eq!(settings.broker.host, "broker.prod");
        assert_eq!(settings.broker.port, 8883);
        assert_eq!(settings.broker.username, "svc");
        assert_eq!(settings.broker.password, "hunter2");
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn invalid_env_port_is_ignored() {
        let vars = env(&[("PYLON_BROKER_PORT", "not-a-port")]);
        let mut settings = PylonSettings::default();
        apply_env_overrides(&mut settings, |name| vars.get(name).cloned());
        assert_eq!(settings.broker.port, 1883);
    }

    #[test]
    fn loaded_settings_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"broker": {"keepAliveSecs": 0}}"#).unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(
            settings.broker.keep_alive_secs,
            crate::types::BrokerSettings::MIN_KEEP_ALIVE_SECS
        );
    }

    #[test]
    fn settings_path_is_under_home() {
        let path = settings_path();
        assert!(path.ends_with(".pylon/settings.json"));
    }
}
