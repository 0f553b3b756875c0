//! WebSocket upgrade and per-connection read/write loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::state::AppState;

/// Capacity of each subscriber's delivery channel. Small on purpose: a
/// subscriber that cannot drain this many frames is falling behind and
/// should start dropping rather than buffer without bound.
pub const SUBSCRIBER_CHANNEL_CAPACITY: usize = 32;

/// One streaming subscriber: identity plus the sending half of the channel
/// its connection task drains.
pub struct StreamClient {
    /// Connection ID.
    pub id: String,
    /// Topic this subscriber observes.
    pub topic: String,
    tx: mpsc::Sender<Arc<String>>,
    drops: AtomicU64,
}

impl StreamClient {
    /// Create a subscriber handle around its delivery channel.
    pub fn new(id: String, topic: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            topic,
            tx,
            drops: AtomicU64::new(0),
        }
    }

    /// Queue a frame for delivery on the subscriber's own task.
    ///
    /// Non-blocking: a full (or closed) channel drops the frame for this
    /// subscriber only. Returns whether the frame was queued.
    pub fn send(&self, frame: Arc<String>) -> bool {
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            let _ = self.drops.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total lifetime frames dropped for this subscriber.
    pub fn drop_count(&self) -> u64 {
        self.drops.load(Ordering::Relaxed)
    }
}

/// Query parameters for the stream subscribe endpoint.
#[derive(Debug, Deserialize)]
pub struct SubscribeParams {
    /// MQTT topic to observe (exact string match, no wildcards).
    pub topic: String,
}

/// `GET /api/v1/mqtt/ws/subscribe?topic=<t>` — upgrade to a persistent
/// stream of every message published on `<t>`.
pub async fn ws_subscribe(
    State(state): State<AppState>,
    Query(params): Query<SubscribeParams>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| serve_stream(state, params.topic, socket))
}

/// Drive one subscriber connection until the client goes away.
async fn serve_stream(state: AppState, topic: String, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
    let client = Arc::new(StreamClient::new(
        Uuid::now_v7().to_string(),
        topic.clone(),
        tx,
    ));

    state.bridge.subscribe(Arc::clone(&client)).await;
    counter!("ws_connections_total").increment(1);
    gauge!("ws_connections_active").increment(1.0);
    info!(conn_id = %client.id, topic = %topic, "stream subscriber connected");

    // Writer: drain the delivery channel into text frames on this
    // connection's task, keeping the broker path free of socket I/O.
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.as_str().into())).await.is_err() {
                break;
            }
        }
    });

    // Reader: inbound frames are a liveness signal only, payloads ignored.
    // Ends on close or transport error, which is the one cleanup trigger.
    while let Some(received) = stream.next().await {
        match received {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    state.bridge.unsubscribe(&topic, &client.id);
    writer.abort();
    counter!("ws_disconnections_total").increment(1);
    gauge!("ws_connections_active").decrement(1.0);
    info!(conn_id = %client.id, topic = %topic, "stream subscriber disconnected");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_queues_until_capacity_then_drops() {
        let (tx, mut rx) = mpsc::channel(2);
        let client = StreamClient::new("c1".into(), "demo".into(), tx);

        assert!(client.send(Arc::new("one".into())));
        assert!(client.send(Arc::new("two".into())));
        // Channel full: dropped, counted.
        assert!(!client.send(Arc::new("three".into())));
        assert_eq!(client.drop_count(), 1);

        assert_eq!(*rx.recv().await.unwrap(), "one");
        assert_eq!(*rx.recv().await.unwrap(), "two");
    }

    #[tokio::test]
    async fn send_to_closed_channel_reports_failure() {
        let (tx, rx) = mpsc::channel(2);
        let client = StreamClient::new("c1".into(), "demo".into(), tx);
        drop(rx);

        assert!(!client.send(Arc::new("gone".into())));
        assert_eq!(client.drop_count(), 1);
    }
}
