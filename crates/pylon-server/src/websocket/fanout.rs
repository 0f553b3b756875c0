//! Topic fan-out to connected stream subscribers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use metrics::counter;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use pylon_broker::BrokerConnection;

use super::connection::StreamClient;

/// Maximum lifetime frame drops before a slow subscriber is evicted.
const MAX_TOTAL_DROPS: u64 = 100;

/// Per-topic subscriber sets behind one lock, plus the active total.
///
/// Shared between the bridge API (subscribe/unsubscribe from connection
/// tasks) and the forwarding handlers (reads + evictions from the broker
/// poll task), so the lock is a sync one and is never held across an await.
struct SubscriberSet {
    topics: RwLock<HashMap<String, Vec<Arc<StreamClient>>>>,
    active: AtomicUsize,
}

impl SubscriberSet {
    fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            active: AtomicUsize::new(0),
        }
    }

    fn add(&self, client: Arc<StreamClient>) {
        let mut topics = self.topics.write();
        topics.entry(client.topic.clone()).or_default().push(client);
        let _ = self.active.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove every subscriber of `topic` whose id passes `predicate`.
    /// An emptied topic entry is removed outright — no empty residue.
    fn remove_where(&self, topic: &str, predicate: impl Fn(&str) -> bool) -> usize {
        let mut topics = self.topics.write();
        let Some(clients) = topics.get_mut(topic) else {
            return 0;
        };
        let before = clients.len();
        clients.retain(|c| !predicate(&c.id));
        let removed = before - clients.len();
        if clients.is_empty() {
            let _ = topics.remove(topic);
        }
        let _ = self.active.fetch_sub(removed, Ordering::Relaxed);
        removed
    }

    /// Snapshot of the current subscribers of `topic`, so iteration is
    /// immune to concurrent mutation and no lock is held while sending.
    fn snapshot(&self, topic: &str) -> Vec<Arc<StreamClient>> {
        self.topics.read().get(topic).cloned().unwrap_or_default()
    }

    fn count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }

    fn contains_topic(&self, topic: &str) -> bool {
        self.topics.read().contains_key(topic)
    }
}

/// Bridges broker topics to WebSocket stream subscribers.
///
/// Registers exactly one forwarding handler per topic with the broker —
/// lazily, when the topic sees its first subscriber ever — and fans every
/// inbound payload out to the subscribers current at dispatch time.
pub struct FanoutBridge {
    broker: Arc<BrokerConnection>,
    subscribers: Arc<SubscriberSet>,
    /// Topics whose forwarding handler is already registered. Entries are
    /// never removed: the handler stays put when a topic's subscriber set
    /// empties, and a returning topic reuses it instead of registering a
    /// second one (which would double-forward).
    forwarded_topics: Mutex<HashSet<String>>,
}

impl FanoutBridge {
    /// Create a bridge over the given broker connection.
    pub fn new(broker: Arc<BrokerConnection>) -> Self {
        Self {
            broker,
            subscribers: Arc::new(SubscriberSet::new()),
            forwarded_topics: Mutex::new(HashSet::new()),
        }
    }

    /// Add a stream subscriber for its topic.
    ///
    /// On the topic's first-ever subscriber, registers the forwarding
    /// handler with the broker (a live subscribe goes out now if connected,
    /// otherwise on the next connect).
    pub async fn subscribe(&self, client: Arc<StreamClient>) {
        let topic = client.topic.clone();
        self.subscribers.add(client);

        let first_time = self.forwarded_topics.lock().insert(topic.clone());
        if first_time {
            let subscribers = Arc::clone(&self.subscribers);
            self.broker
                .subscribe(
                    &topic,
                    Arc::new(move |tp, payload| forward(&subscribers, tp, payload)),
                    0,
                )
                .await;
            debug!(topic = %topic, "forwarding handler registered");
        }
    }

    /// Remove one subscriber from `topic`. Idempotent; called exactly once
    /// by the connection task when the client goes away.
    pub fn unsubscribe(&self, topic: &str, client_id: &str) {
        let removed = self.subscribers.remove_where(topic, |id| id == client_id);
        if removed > 0 {
            debug!(topic, client_id, "stream subscriber removed");
        }
    }

    /// Subscribers currently attached to `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers.count(topic)
    }

    /// Whether `topic` currently holds any subscribers.
    pub fn has_topic(&self, topic: &str) -> bool {
        self.subscribers.contains_topic(topic)
    }

    /// Total subscribers across all topics.
    pub fn active_count(&self) -> usize {
        self.subscribers.active.load(Ordering::Relaxed)
    }
}

/// Forward one inbound payload to every current subscriber of `topic`.
///
/// Runs on the broker connection's poll task: snapshot the subscriber set,
/// then fire-and-forget into each subscriber's own channel. A failed
/// delivery affects nobody else and nothing propagates back to the network
/// path; subscribers past the drop threshold are evicted.
fn forward(subscribers: &SubscriberSet, topic: &str, payload: &[u8]) {
    let snapshot = subscribers.snapshot(topic);
    if snapshot.is_empty() {
        return;
    }

    let frame = Arc::new(String::from_utf8_lossy(payload).into_owned());
    let mut to_evict = Vec::new();
    for client in &snapshot {
        if client.send(Arc::clone(&frame)) {
            counter!("fanout_deliveries_total").increment(1);
        } else {
            counter!("fanout_drops_total").increment(1);
            let drops = client.drop_count();
            if drops >= MAX_TOTAL_DROPS {
                warn!(topic, conn_id = %client.id, drops, "evicting slow stream subscriber");
                to_evict.push(client.id.clone());
            } else {
                warn!(topic, conn_id = %client.id, drops, "subscriber channel full, frame dropped");
            }
        }
    }
    if !to_evict.is_empty() {
        let _ = subscribers.remove_where(topic, |id| to_evict.iter().any(|evict| evict == id));
    }
    debug!(topic, recipients = snapshot.len(), "fanned out frame");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
