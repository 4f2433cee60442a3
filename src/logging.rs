//! Tracing subscriber setup

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| anyhow!("Invalid log filter {:?}: {}", config.level, e))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if config.json {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow!("Failed to install JSON subscriber: {}", e))
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow!("Failed to install subscriber: {}", e))
    }
}
