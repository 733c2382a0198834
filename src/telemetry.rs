// src/telemetry.rs

//! Logging setup for hosts that do not install their own subscriber.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to `level`
/// (e.g. `"info"` or `"bb84=debug"`), then to `info` if `level` does not parse.
///
/// Returns `false` if a global subscriber was already installed, which makes
/// repeated calls (e.g. from several tests) harmless.
pub fn init_logging(level: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(level, "Logging initialized");
    }
    installed
}
