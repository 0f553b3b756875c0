//! # pylon-broker
//!
//! MQTT connectivity for the Pylon gateway.
//!
//! - **[`connection`]**: the single long-lived broker connection; network
//!   I/O and inbound dispatch run on a private background task
//! - **[`registry`]**: ordered topic → handler association consulted on
//!   every inbound message; survives reconnects
//! - **[`crawler`]**: the crawler control-plane consumer (command topic in,
//!   status topic out)
//!
//! ## Data Flow
//!
//! Inbound: broker → `connection` poll task → `registry` dispatch →
//! handlers. Outbound: any caller → [`connection::BrokerConnection::publish`].

#![deny(unsafe_code)]

pub mod connection;
pub mod crawler;
pub mod registry;

pub use connection::{BrokerConnection, ConnectionState};
pub use crawler::CrawlerMessageService;
pub use registry::{TopicHandler, TopicHandlerRegistry};
