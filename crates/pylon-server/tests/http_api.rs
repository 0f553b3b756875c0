//! HTTP contract tests against a live server with a disconnected broker.
//!
//! No MQTT broker runs in these tests: the connection object exists but
//! `connect()` is never called, which is exactly the state the endpoints
//! must degrade gracefully in.

#![allow(missing_docs)]

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use pylon_broker::{BrokerConnection, CrawlerMessageService, TopicHandlerRegistry};
use pylon_server::routes;
use pylon_server::state::AppState;
use pylon_server::websocket::FanoutBridge;
use pylon_settings::BrokerSettings;

async fn spawn_server() -> (String, AppState) {
    let registry = Arc::new(TopicHandlerRegistry::new());
    let broker = Arc::new(BrokerConnection::new(BrokerSettings::default(), registry));
    let crawler = Arc::new(CrawlerMessageService::new(Arc::clone(&broker)).await);
    let bridge = Arc::new(FanoutBridge::new(Arc::clone(&broker)));
    let prometheus = PrometheusBuilder::new().build_recorder().handle();
    let state = AppState {
        broker,
        crawler,
        bridge,
        prometheus,
    };

    let app = routes::router(state.clone(), &["http://localhost:3000".to_string()]);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn root_banner_and_liveness() {
    let (base, _state) = spawn_server().await;

    let body: serde_json::Value = reqwest::get(format!("{base}/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "pylon gateway");

    let body: serde_json::Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn broker_health_reports_disconnected() {
    let (base, _state) = spawn_server().await;

    let body: serde_json::Value = reqwest::get(format!("{base}/api/v1/mqtt/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["isConnected"], false);
}

#[tokio::test]
async fn publish_while_disconnected_is_success_false_not_an_error() {
    let (base, _state) = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/mqtt/publish"))
        .json(&serde_json::json!({"topic": "x", "payload": "y"}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["topic"], "x");
    assert_eq!(body["payload"], "y");
    assert_eq!(body["qos"], 0);
    assert_eq!(body["retain"], false);
}

#[tokio::test]
async fn publish_clamps_out_of_range_qos() {
    let (base, _state) = spawn_server().await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .post(format!("{base}/api/v1/mqtt/publish"))
        .json(&serde_json::json!({"topic": "x", "payload": "y", "qos": 7, "retain": true}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["qos"], 2);
    assert_eq!(body["retain"], true);
}

#[tokio::test]
async fn command_endpoint_validates_the_action() {
    let (base, _state) = spawn_server().await;
    let client = reqwest::Client::new();

    // Valid action: accepted, publish refused because disconnected.
    let body: serde_json::Value = client
        .post(format!("{base}/api/v1/mqtt/command"))
        .json(&serde_json::json!({"action": "start_crawl"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["topic"], "command/video_crawler");
    assert_eq!(body["payload"], "start_crawl");

    // Unknown action: rejected before any broker interaction.
    let resp = client
        .post(format!("{base}/api/v1/mqtt/command"))
        .json(&serde_json::json!({"action": "fly_to_mars"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn status_endpoint_reports_the_publish_result() {
    let (base, _state) = spawn_server().await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .post(format!("{base}/api/v1/mqtt/status"))
        .json(&serde_json::json!({"status": "started", "details": {"feeds": 3}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["topic"], "status/video_crawler");
}

#[tokio::test]
async fn metrics_endpoint_renders_prometheus_text() {
    let (base, _state) = spawn_server().await;

    let resp = reqwest::get(format!("{base}/metrics")).await.unwrap();
    assert!(resp.status().is_success());
    // Possibly empty before any metric is recorded, but always renders.
    let _body = resp.text().await.unwrap();
}
