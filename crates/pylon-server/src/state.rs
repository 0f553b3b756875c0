//! Shared application state injected into every route handler.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use pylon_broker::{BrokerConnection, CrawlerMessageService};

use crate::websocket::FanoutBridge;

/// Everything the HTTP and WebSocket handlers need, cloned per request.
///
/// All members are shared handles; construction happens once in the
/// gateway binary (or directly in tests) and nothing here is global.
#[derive(Clone)]
pub struct AppState {
    /// The single broker connection.
    pub broker: Arc<BrokerConnection>,
    /// Crawler control-plane service.
    pub crawler: Arc<CrawlerMessageService>,
    /// Stream fan-out bridge.
    pub bridge: Arc<FanoutBridge>,
    /// Handle for rendering the `/metrics` endpoint.
    pub prometheus: PrometheusHandle,
}
