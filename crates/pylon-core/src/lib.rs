//! # pylon-core
//!
//! Foundation crate for the Pylon gateway.
//!
//! Provides the small shared vocabulary the other pylon crates depend on:
//!
//! - **Logging**: [`logging::init`] builds the global tracing subscriber
//!   (env-filter, optional JSON output)
//! - **Topics**: [`topics`] holds the well-known MQTT topic names used by
//!   the crawler control plane
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other pylon crates.

#![deny(unsafe_code)]

pub mod logging;
pub mod topics;
