//! MQTT control endpoints: broker health, crawler command/status, generic
//! publish.
//!
//! Every publish-shaped endpoint returns a structured `success` flag;
//! transport conditions (including publish-while-disconnected) are never
//! surfaced as HTTP errors.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{instrument, warn};

use pylon_core::topics::{CRAWLER_COMMAND_TOPIC, CRAWLER_STATUS_TOPIC};

use crate::state::AppState;

/// Crawler actions accepted by the command endpoint. Anything else is a
/// request-level 422, before the broker is involved.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    /// Start a crawl run.
    StartCrawl,
    /// Stop the active crawl run.
    StopCrawl,
}

impl CommandAction {
    /// Wire payload published on the command topic.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartCrawl => "start_crawl",
            Self::StopCrawl => "stop_crawl",
        }
    }
}

/// Body of `POST /api/v1/mqtt/command`.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    /// The crawler action to publish.
    pub action: CommandAction,
}

/// Body of `POST /api/v1/mqtt/status`.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// Status keyword, e.g. `started`/`progress`/`completed`/`error`.
    pub status: String,
    /// Free-form details attached to the status.
    pub details: Value,
}

/// Body of `POST /api/v1/mqtt/publish`.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    /// Topic to publish on.
    pub topic: String,
    /// Message payload.
    pub payload: String,
    /// QoS level 0–2 (values above 2 are clamped).
    #[serde(default)]
    pub qos: u8,
    /// Whether the broker should retain the message.
    #[serde(default)]
    pub retain: bool,
}

/// Response of the broker health endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Whether the broker connection is currently up.
    pub is_connected: bool,
}

/// Response of the command endpoint.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// Whether the transport accepted the publish.
    pub success: bool,
    /// Topic the command went to.
    pub topic: &'static str,
    /// Payload that was published.
    pub payload: &'static str,
}

/// Response of the status endpoint.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Whether the transport accepted the publish.
    pub success: bool,
    /// Topic the status went to.
    pub topic: &'static str,
}

/// Response of the generic publish endpoint.
#[derive(Debug, Serialize)]
pub struct PublishResponse {
    /// Whether the transport accepted the publish.
    pub success: bool,
    /// Topic published on.
    pub topic: String,
    /// Payload that was published.
    pub payload: String,
    /// Effective QoS after clamping.
    pub qos: u8,
    /// Retain flag as sent.
    pub retain: bool,
}

/// `GET /api/v1/mqtt/health` — broker connection state. Never fails.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        is_connected: state.broker.is_connected(),
    })
}

/// `POST /api/v1/mqtt/command` — publish a crawler command.
#[instrument(skip(state))]
pub async fn command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Json<CommandResponse> {
    let payload = req.action.as_str();
    let success = state
        .broker
        .publish(CRAWLER_COMMAND_TOPIC, payload, 0, false)
        .await;
    Json(CommandResponse {
        success,
        topic: CRAWLER_COMMAND_TOPIC,
        payload,
    })
}

/// `POST /api/v1/mqtt/status` — publish a crawl status via the service.
#[instrument(skip(state, req))]
pub async fn status(
    State(state): State<AppState>,
    Json(req): Json<StatusRequest>,
) -> Json<StatusResponse> {
    let success = state
        .crawler
        .publish_crawl_status(&req.status, &req.details)
        .await;
    Json(StatusResponse {
        success,
        topic: CRAWLER_STATUS_TOPIC,
    })
}

/// `POST /api/v1/mqtt/publish` — publish to an arbitrary topic.
#[instrument(skip(state, req), fields(topic = %req.topic))]
pub async fn publish(
    State(state): State<AppState>,
    Json(req): Json<PublishRequest>,
) -> Json<PublishResponse> {
    let qos = if req.qos > 2 {
        warn!(requested = req.qos, "qos above 2 clamped");
        2
    } else {
        req.qos
    };
    let success = state
        .broker
        .publish(&req.topic, &req.payload, qos, req.retain)
        .await;
    Json(PublishResponse {
        success,
        topic: req.topic,
        payload: req.payload,
        qos,
        retain: req.retain,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_action_wire_format() {
        let start: CommandAction = serde_json::from_str(r#""start_crawl""#).unwrap();
        assert_eq!(start, CommandAction::StartCrawl);
        assert_eq!(start.as_str(), "start_crawl");

        let stop: CommandAction = serde_json::from_str(r#""stop_crawl""#).unwrap();
        assert_eq!(stop.as_str(), "stop_crawl");
    }

    #[test]
    fn unknown_action_is_rejected_at_parse_time() {
        let parsed: Result<CommandRequest, _> =
            serde_json::from_str(r#"{"action": "fly_to_mars"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn publish_request_defaults() {
        let req: PublishRequest =
            serde_json::from_str(r#"{"topic": "t", "payload": "p"}"#).unwrap();
        assert_eq!(req.qos, 0);
        assert!(!req.retain);
    }

    #[test]
    fn health_response_uses_camel_case() {
        let json = serde_json::to_value(HealthResponse { is_connected: true }).unwrap();
        assert_eq!(json, serde_json::json!({"isConnected": true}));
    }

    #[test]
    fn publish_response_echoes_the_request() {
        let json = serde_json::to_value(PublishResponse {
            success: false,
            topic: "t".into(),
            payload: "p".into(),
            qos: 1,
            retain: true,
        })
        .unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["topic"], "t");
        assert_eq!(json["qos"], 1);
        assert_eq!(json["retain"], true);
    }
}
