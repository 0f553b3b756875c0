//! HTTP surface: router assembly and app-level endpoints.

pub mod mqtt;

use axum::extract::State;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::websocket;

/// Assemble the full router for the gateway.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let mqtt_api = Router::new()
        .route("/health", get(mqtt::health))
        .route("/command", post(mqtt::command))
        .route("/status", post(mqtt::status))
        .route("/publish", post(mqtt::publish))
        .route("/ws/subscribe", get(websocket::ws_subscribe));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .nest("/api/v1/mqtt", mqtt_api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_origins)),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// `GET /` — service banner.
async fn root() -> Json<Value> {
    Json(json!({
        "message": "pylon gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "api": "/api/v1",
    }))
}

/// `GET /health` — process liveness, independent of broker state.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// `GET /metrics` — Prometheus text format.
async fn metrics_text(State(state): State<AppState>) -> String {
    crate::metrics::render(&state.prometheus)
}
