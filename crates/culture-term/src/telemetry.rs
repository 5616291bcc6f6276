//! Tracing subscriber setup.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Logs go to stderr so stdout stays free for the final report. While the
/// terminal is being drawn on, only warnings are let through by default.
pub fn init_telemetry(headless: bool, json: bool) -> Result<()> {
    let default_filter = if headless {
        "info,culture_world=debug"
    } else {
        "warn"
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(fmt_layer)
        .try_init()?;

    info!("Telemetry initialized");
    Ok(())
}
