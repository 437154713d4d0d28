//! Log output for the light harness.

use anyhow::Context;
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info,steel_light=debug";

/// Installs the global subscriber and routes `log` records from the library into it.
pub fn init() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry().with(filter).with(console);
    tracing::subscriber::set_global_default(subscriber)
        .context("a global tracing subscriber is already installed")?;
    LogTracer::init().context("failed to bridge log records into tracing")?;
    Ok(())
}
