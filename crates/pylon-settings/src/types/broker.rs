//! MQTT broker connection settings.

use serde::{Deserialize, Serialize};

/// Connection parameters for the MQTT broker.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerSettings {
    /// Broker hostname or IP.
    pub host: String,
    /// Broker TCP port.
    pub port: u16,
    /// Username for broker authentication (empty = anonymous).
    pub username: String,
    /// Password for broker authentication.
    pub password: String,
    /// Prefix for the generated MQTT client id. A random suffix is appended
    /// per connection so parallel instances do not evict each other.
    pub client_id_prefix: String,
    /// MQTT keep-alive interval in seconds.
    pub keep_alive_secs: u64,
    /// Delay before the transport retries after a connection failure.
    pub reconnect_delay_secs: u64,
    /// Capacity of the outbound request channel to the event loop.
    pub channel_capacity: usize,
}

impl BrokerSettings {
    /// Smallest keep-alive the transport accepts.
    pub const MIN_KEEP_ALIVE_SECS: u64 = 5;
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: String::new(),
            password: String::new(),
            client_id_prefix: "pylon".to_string(),
            keep_alive_secs: 60,
            reconnect_delay_secs: 5,
            channel_capacity: 128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_local_broker() {
        let b = BrokerSettings::default();
        assert_eq!(b.host, "localhost");
        assert_eq!(b.port, 1883);
        assert!(b.username.is_empty());
    }

    #[test]
    fn camel_case_wire_format() {
        let json = serde_json::to_value(BrokerSettings::default()).unwrap();
        assert!(json.get("reconnectDelaySecs").is_some());
        assert!(json.get("reconnect_delay_secs").is_none());
    }
}
