//! Tracing initialization.
//!
//! Sets up tracing-subscriber with an `EnvFilter` (honoring `RUST_LOG`, default
//! `info`) and a fmt layer. The fmt layer emits either human-readable console
//! output or JSON lines depending on the configured [`LogFormat`], so the same
//! binary works for local development and log-aggregated deployments.

use crate::config::LogFormat;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber.
///
/// Returns an error if a subscriber was already installed (e.g. when called
/// twice from tests).
pub fn init_telemetry(format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Plain => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
    }

    info!("Telemetry initialized ({:?} output)", format);
    Ok(())
}
