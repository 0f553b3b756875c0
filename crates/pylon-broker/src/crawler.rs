//! Crawler control-plane message service.
//!
//! The representative business consumer of the broker connection: listens
//! on the command topic, publishes on the status topic, and never touches
//! fan-out internals.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use pylon_core::topics::{CRAWLER_COMMAND_TOPIC, CRAWLER_STATUS_TOPIC, START_CRAWL, STOP_CRAWL};

use crate::connection::BrokerConnection;

/// Subscribes to crawler commands and publishes crawl status updates.
///
/// Holds no state of its own beyond the shared connection.
pub struct CrawlerMessageService {
    broker: Arc<BrokerConnection>,
}

impl CrawlerMessageService {
    /// Create the service and register its command handler.
    ///
    /// Registration goes through the connection so the subscription is
    /// restored automatically on every reconnect.
    pub async fn new(broker: Arc<BrokerConnection>) -> Self {
        broker
            .subscribe(CRAWLER_COMMAND_TOPIC, Arc::new(handle_command), 0)
            .await;
        info!(topic = CRAWLER_COMMAND_TOPIC, "crawler command handler registered");
        Self { broker }
    }

    /// Format and publish a status update on the crawler status topic.
    ///
    /// Returns the transport's publish result; `false` while disconnected.
    pub async fn publish_crawl_status(&self, status: &str, details: &Value) -> bool {
        let payload = format_status(status, details);
        let ok = self
            .broker
            .publish(CRAWLER_STATUS_TOPIC, &payload, 0, false)
            .await;
        if ok {
            info!(topic = CRAWLER_STATUS_TOPIC, payload = %payload, "published crawl status");
        }
        ok
    }
}

/// Handle one inbound command message. Never fails: unrecognized commands
/// are logged and dropped, so a bad payload cannot disturb dispatch.
fn handle_command(topic: &str, payload: &[u8]) {
    let command = String::from_utf8_lossy(payload);
    info!(topic, command = %command, "received crawler command");

    if command.contains(START_CRAWL) {
        info!("starting video crawl");
    } else if command.contains(STOP_CRAWL) {
        info!("stopping video crawl");
    } else {
        warn!(topic, command = %command, "unknown crawler command, ignoring");
    }
}

/// `"{status}: {details}"` — strings render bare, other JSON as JSON.
fn format_status(status: &str, details: &Value) -> String {
    match details {
        Value::String(text) => format!("{status}: {text}"),
        other => format!("{status}: {other}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
