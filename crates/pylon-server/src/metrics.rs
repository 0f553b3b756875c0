//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across crates.

/// Successful broker connects total (counter).
pub const BROKER_CONNECTS_TOTAL: &str = "broker_connects_total";
/// Transport reconnect attempts total (counter).
pub const BROKER_RECONNECTS_TOTAL: &str = "broker_reconnects_total";
/// Inbound broker messages total (counter).
pub const BROKER_MESSAGES_TOTAL: &str = "broker_messages_total";
/// Publish submissions total (counter, labels: outcome).
pub const BROKER_PUBLISHES_TOTAL: &str = "broker_publishes_total";
/// Handler panics contained during dispatch (counter).
pub const BROKER_HANDLER_PANICS_TOTAL: &str = "broker_handler_panics_total";
/// Stream subscriber connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Stream subscriber disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active stream subscribers (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Frames queued to subscribers total (counter).
pub const FANOUT_DELIVERIES_TOTAL: &str = "fanout_deliveries_total";
/// Frames dropped on full subscriber channels total (counter).
pub const FANOUT_DROPS_TOTAL: &str = "fanout_drops_total";
