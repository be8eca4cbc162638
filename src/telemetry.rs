//! Global `tracing` subscriber setup

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` wins over the configured level;
/// `verbose` raises this crate to debug.
pub fn init(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(logging, verbose)))
        .with_context(|| "Invalid log filter")?;

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init()
    }
    .with_context(|| "Failed to set global tracing subscriber")
}

fn default_directive(logging: &LoggingConfig, verbose: bool) -> String {
    if verbose {
        format!("{},wayfinder=debug", logging.level)
    } else {
        logging.level.clone()
    }
}
