//! Global tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from `level`
/// (the configured default, e.g. `"info"` or `"pylon_broker=debug"`).
/// With `json` enabled, log lines are emitted as structured JSON for
/// collector ingestion; otherwise human-readable fmt output.
///
/// Safe to call more than once: a second call is a no-op (tests share a
/// process and each may try to install).
pub fn init(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if installed.is_err() {
        tracing::debug!("global tracing subscriber already installed");
    }
}
