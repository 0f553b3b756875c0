//! Streaming fan-out from broker topics to WebSocket subscribers.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `connection` | WebSocket upgrade, per-connection read/write loops |
//! | `fanout` | Per-topic subscriber sets, one forwarding handler per topic |
//!
//! ## Data Flow
//!
//! broker poll task → forwarding handler (snapshot + `try_send`) →
//! per-subscriber channel → that subscriber's writer task → text frame.
//! The broker path never blocks on a subscriber.

pub mod connection;
pub mod fanout;

pub use connection::{StreamClient, ws_subscribe};
pub use fanout::FanoutBridge;
