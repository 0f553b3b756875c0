//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` to match the JSON wire
//! format. Each type implements [`Default`] with production default values.
//! Types marked with `#[serde(default)]` allow partial JSON — missing fields
//! get their default value during deserialization.

mod broker;
mod logging;
mod server;

pub use broker::*;
pub use logging::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Root settings type for the Pylon gateway.
///
/// Loaded from `~/.pylon/settings.json` with defaults applied for missing
/// fields. `PYLON_*` environment variables can override specific values.
///
/// # JSON Format
///
/// All field names are camelCase. Example:
///
/// ```json
/// {
///   "version": "0.1.0",
///   "name": "pylon",
///   "broker": { "host": "10.0.0.4", "port": 1883 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PylonSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// MQTT broker connection settings.
    pub broker: BrokerSettings,
    /// HTTP/WebSocket server settings.
    pub server: ServerSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for PylonSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "pylon".to_string(),
            broker: BrokerSettings::default(),
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl PylonSettings {
    /// Correct out-of-range values instead of rejecting them.
    ///
    /// Called automatically during loading. Invalid values are clamped with
    /// a warning so users get corrected behavior instead of a confusing
    /// startup error.
    pub fn validate(&mut self) {
        let broker = &mut self.broker;
        if broker.keep_alive_secs < BrokerSettings::MIN_KEEP_ALIVE_SECS {
            tracing::warn!(
                "broker keepAliveSecs ({}) below minimum, clamped to {}",
                broker.keep_alive_secs,
                BrokerSettings::MIN_KEEP_ALIVE_SECS
            );
            broker.keep_alive_secs = BrokerSettings::MIN_KEEP_ALIVE_SECS;
        }
        if broker.reconnect_delay_secs == 0 {
            tracing::warn!("broker reconnectDelaySecs of 0 would spin, clamped to 1");
            broker.reconnect_delay_secs = 1;
        }
        if broker.channel_capacity == 0 {
            tracing::warn!("broker channelCapacity of 0 is unusable, clamped to 1");
            broker.channel_capacity = 1;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_version() {
        let s = PylonSettings::default();
        assert_eq!(s.version, "0.1.0");
        assert_eq!(s.name, "pylon");
    }

    #[test]
    fn default_settings_serde_roundtrip() {
        let defaults = PylonSettings::default();
        let json = serde_json::to_string(&defaults).unwrap();
        let back: PylonSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.version, defaults.version);
        assert_eq!(back.broker.host, defaults.broker.host);
        assert_eq!(back.server.port, defaults.server.port);
    }

    #[test]
    fn default_settings_json_field_names() {
        let json = serde_json::to_value(PylonSettings::default()).unwrap();

        // Root fields are camelCase
        assert!(json.get("version").is_some());
        assert!(json.get("broker").is_some());

        // Nested fields are camelCase
        assert!(json["broker"].get("keepAliveSecs").is_some());
        assert!(json["broker"].get("clientIdPrefix").is_some());
        assert!(json["server"].get("corsOrigins").is_some());
    }

    #[test]
    fn partial_json_gets_defaults() {
        let s: PylonSettings =
            serde_json::from_str(r#"{"broker": {"host": "mqtt.internal"}}"#).unwrap();
        assert_eq!(s.broker.host, "mqtt.internal");
        assert_eq!(s.broker.port, 1883);
        assert_eq!(s.server.port, 8000);
    }

    #[test]
    fn validate_clamps_keep_alive() {
        let mut s = PylonSettings::default();
        s.broker.keep_alive_secs = 1;
        s.validate();
        assert_eq!(s.broker.keep_alive_secs, BrokerSettings::MIN_KEEP_ALIVE_SECS);
    }

    #[test]
    fn validate_clamps_zero_reconnect_delay_and_capacity() {
        let mut s = PylonSettings::default();
        s.broker.reconnect_delay_secs = 0;
        s.broker.channel_capacity = 0;
        s.validate();
        assert_eq!(s.broker.reconnect_delay_secs, 1);
        assert_eq!(s.broker.channel_capacity, 1);
    }

    #[test]
    fn validate_leaves_sane_values_alone() {
        let mut s = PylonSettings::default();
        let before = s.broker.clone();
        s.validate();
        assert_eq!(s.broker.keep_alive_secs, before.keep_alive_secs);
        assert_eq!(s.broker.reconnect_delay_secs, before.reconnect_delay_secs);
    }
}
