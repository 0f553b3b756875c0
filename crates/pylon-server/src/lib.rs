//! # pylon-server
//!
//! Axum HTTP + WebSocket surface for the Pylon gateway.
//!
//! - **[`routes`]**: REST endpoints (broker health, command/status/generic
//!   publish) and app-level endpoints (banner, liveness, metrics)
//! - **[`websocket`]**: streaming subscribe endpoint and the fan-out bridge
//!   that republishes broker messages to every connected subscriber
//! - **[`state`]**: shared [`state::AppState`] injected into handlers
//! - **[`metrics`]**: Prometheus recorder and metric name constants

#![deny(unsafe_code)]

pub mod metrics;
pub mod routes;
pub mod state;
pub mod websocket;
