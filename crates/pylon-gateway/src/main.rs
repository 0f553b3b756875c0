//! Pylon gateway binary.
//!
//! Wires settings → logging → metrics → broker connection → crawler
//! service → fan-out bridge → HTTP server, then serves until SIGINT or
//! SIGTERM and disconnects the broker on the way out.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use pylon_broker::{BrokerConnection, CrawlerMessageService, TopicHandlerRegistry};
use pylon_server::routes;
use pylon_server::state::AppState;
use pylon_server::websocket::FanoutBridge;
use pylon_settings::PylonSettings;

#[derive(Debug, Parser)]
#[command(name = "pylon-gateway", about = "MQTT to WebSocket gateway")]
struct Args {
    /// Path to a settings file (defaults to `~/.pylon/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override the HTTP listen port from settings.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) => pylon_settings::load_settings_from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => match pylon_settings::load_settings() {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("failed to load settings ({e}), using defaults");
                PylonSettings::default()
            }
        },
    };
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    pylon_core::logging::init(&settings.logging.level, settings.logging.json);
    pylon_settings::init_settings(settings.clone());

    let prometheus = pylon_server::metrics::install_recorder();

    // Explicit construction, no globals: the registry and connection are
    // handed to every component that needs them.
    let registry = Arc::new(TopicHandlerRegistry::new());
    let broker = Arc::new(BrokerConnection::new(settings.broker.clone(), registry));
    broker.connect();

    let crawler = Arc::new(CrawlerMessageService::new(Arc::clone(&broker)).await);
    let bridge = Arc::new(FanoutBridge::new(Arc::clone(&broker)));

    let state = AppState {
        broker: Arc::clone(&broker),
        crawler,
        bridge,
        prometheus,
    };
    let app = routes::router(state, &settings.server.cors_origins);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        %addr,
        name = %settings.name,
        version = %settings.version,
        "pylon gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    broker.disconnect().await;
    info!("pylon gateway stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
