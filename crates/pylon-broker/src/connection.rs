//! The single long-lived MQTT broker connection.
//!
//! All network I/O and inbound-message dispatch run on one background tokio
//! task owned by [`BrokerConnection::connect`]; callers never block on
//! broker I/O. Reconnection is driven by the transport's event loop — every
//! successful connect rebuilds broker-side subscriptions from the
//! [`TopicHandlerRegistry`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use metrics::counter;
use parking_lot::Mutex;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use pylon_settings::BrokerSettings;

use crate::registry::{TopicHandler, TopicHandlerRegistry};

/// Connection lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// No connection, and no attempt in flight.
    Disconnected = 0,
    /// Handshake in flight (or transport waiting to retry).
    Connecting = 1,
    /// CONNACK accepted; publishes and live subscribes go through.
    Connected = 2,
}

/// Lock-free state flag shared between the API surface and the poll task.
struct StateCell(AtomicU8);

impl StateCell {
    const fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Disconnected as u8))
    }

    fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    fn get(&self) -> ConnectionState {
        match self.0.load(Ordering::Acquire) {
            2 => ConnectionState::Connected,
            1 => ConnectionState::Connecting,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Owns the outbound MQTT connection and its background worker.
///
/// Constructed once at startup and shared by `Arc` with every component
/// that publishes or registers handlers.
pub struct BrokerConnection {
    settings: BrokerSettings,
    registry: Arc<TopicHandlerRegistry>,
    state: Arc<StateCell>,
    client: Mutex<Option<AsyncClient>>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl BrokerConnection {
    /// Create a disconnected connection around an existing registry.
    pub fn new(settings: BrokerSettings, registry: Arc<TopicHandlerRegistry>) -> Self {
        Self {
            settings,
            registry,
            state: Arc::new(StateCell::new()),
            client: Mutex::new(None),
            poll_task: Mutex::new(None),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Whether the broker has accepted the connection.
    pub fn is_connected(&self) -> bool {
        self.state.get() == ConnectionState::Connected
    }

    /// The handler registry this connection dispatches into.
    pub fn registry(&self) -> Arc<TopicHandlerRegistry> {
        Arc::clone(&self.registry)
    }

    /// Start connecting in the background. Non-blocking.
    ///
    /// Spawns the poll task that drives the handshake, inbound dispatch,
    /// and automatic reconnection. At most one worker ever runs: calling
    /// again while the previous worker is alive is a no-op, even when the
    /// transport is mid-retry and the state flag reads `Disconnected`.
    pub fn connect(&self) {
        let mut task_slot = self.poll_task.lock();
        if let Some(task) = task_slot.as_ref() {
            if !task.is_finished() {
                debug!("connect requested while worker already running, ignoring");
                return;
            }
        }

        let client_id = format!(
            "{}-{}",
            self.settings.client_id_prefix,
            Uuid::now_v7().simple()
        );
        let mut options =
            MqttOptions::new(client_id, self.settings.host.clone(), self.settings.port);
        let _ = options.set_keep_alive(Duration::from_secs(self.settings.keep_alive_secs));
        if !self.settings.username.is_empty() {
            let _ = options.set_credentials(
                self.settings.username.clone(),
                self.settings.password.clone(),
            );
        }

        let (client, event_loop) = AsyncClient::new(options, self.settings.channel_capacity);
        *self.client.lock() = Some(client.clone());
        self.state.set(ConnectionState::Connecting);
        info!(
            host = %self.settings.host,
            port = self.settings.port,
            "connecting to MQTT broker"
        );

        let task = tokio::spawn(poll_loop(
            event_loop,
            client,
            Arc::clone(&self.registry),
            Arc::clone(&self.state),
            Duration::from_secs(self.settings.reconnect_delay_secs),
        ));
        *task_slot = Some(task);
    }

    /// Stop the background worker and close the connection.
    ///
    /// Idempotent, and deliberately unconditional: the transport disconnect
    /// and the task abort are attempted regardless of the state flag, which
    /// guards against partial states where the socket exists but the flag
    /// is stale.
    pub async fn disconnect(&self) {
        let client = self.client.lock().clone();
        if let Some(client) = client {
            if let Err(e) = client.disconnect().await {
                debug!(error = %e, "disconnect request undeliverable, event loop already gone");
            }
        }
        if let Some(task) = self.poll_task.lock().take() {
            task.abort();
        }
        self.state.set(ConnectionState::Disconnected);
        info!("MQTT client stopped");
    }

    /// Publish a message.
    ///
    /// Returns `false` without error when not connected — publishing while
    /// disconnected is a normal, expected condition. Returns `true` only
    /// when the transport accepted the submission.
    pub async fn publish(&self, topic: &str, payload: &str, qos: u8, retain: bool) -> bool {
        if !self.is_connected() {
            warn!(topic, "publish requested while disconnected, dropping");
            counter!("broker_publishes_total", "outcome" => "not_connected").increment(1);
            return false;
        }
        let client = self.client.lock().clone();
        let Some(client) = client else {
            // State said connected but no client exists; stale flag.
            warn!(topic, "publish requested before first connect, dropping");
            return false;
        };

        match client.publish(topic, to_qos(qos), retain, payload).await {
            Ok(()) => {
                counter!("broker_publishes_total", "outcome" => "ok").increment(1);
                debug!(topic, payload, qos, retain, "published");
                true
            }
            Err(e) => {
                counter!("broker_publishes_total", "outcome" => "error").increment(1);
                error!(topic, error = %e, "transport rejected publish");
                false
            }
        }
    }

    /// Register `handler` for `topic` and subscribe on the live connection.
    ///
    /// The registry entry is made unconditionally; the live broker-side
    /// subscribe happens now when connected, otherwise it is deferred to
    /// the next successful connect.
    pub async fn subscribe(&self, topic: &str, handler: TopicHandler, qos: u8) {
        self.registry.register(topic, handler);

        if !self.is_connected() {
            debug!(topic, "not connected, live subscribe deferred until connect");
            return;
        }
        let client = self.client.lock().clone();
        if let Some(client) = client {
            match client.subscribe(topic, to_qos(qos)).await {
                Ok(()) => info!(topic, qos, "subscribed"),
                Err(e) => {
                    warn!(topic, error = %e, "live subscribe failed, will be restored on reconnect");
                }
            }
        }
    }
}

/// Drive the transport event loop until the task is aborted.
///
/// Runs on the connection's private task: handshake completion, inbound
/// dispatch, and reconnect pacing all happen here and nowhere else.
async fn poll_loop(
    mut event_loop: EventLoop,
    client: AsyncClient,
    registry: Arc<TopicHandlerRegistry>,
    state: Arc<StateCell>,
    reconnect_delay: Duration,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    state.set(ConnectionState::Connected);
                    counter!("broker_connects_total").increment(1);
                    info!("MQTT broker connected");
                    resubscribe_all(&client, &registry).await;
                } else {
                    state.set(ConnectionState::Disconnected);
                    error!(code = ?ack.code, "MQTT broker refused connection");
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                counter!("broker_messages_total").increment(1);
                debug!(
                    topic = %publish.topic,
                    bytes = publish.payload.len(),
                    "inbound message"
                );
                let _ = registry.dispatch(&publish.topic, &publish.payload);
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                state.set(ConnectionState::Disconnected);
                warn!("broker closed the connection");
            }
            Ok(_) => {}
            Err(e) => {
                state.set(ConnectionState::Disconnected);
                counter!("broker_reconnects_total").increment(1);
                warn!(error = %e, delay_secs = reconnect_delay.as_secs(), "MQTT connection error, retrying");
                tokio::time::sleep(reconnect_delay).await;
                state.set(ConnectionState::Connecting);
            }
        }
    }
}

/// Re-issue a live subscribe for every topic in the registry.
///
/// This is how a reconnect restores prior subscriptions without replaying
/// registration: the registry is durable, the broker-side subscription is
/// ephemeral and rebuilt here in full.
async fn resubscribe_all(client: &AsyncClient, registry: &TopicHandlerRegistry) {
    for topic in registry.topics() {
        match client.subscribe(topic.as_str(), QoS::AtMostOnce).await {
            Ok(()) => info!(topic = %topic, "subscription restored"),
            Err(e) => warn!(topic = %topic, error = %e, "failed to restore subscription"),
        }
    }
}

fn to_qos(level: u8) -> QoS {
    match level {
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
