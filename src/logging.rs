//! Tracing setup for binaries.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the application. `RUST_LOG` takes precedence over the configured level:
//!
//! ```bash
//! RUST_LOG=lltf=debug lltf --simulate tune 600
//! ```

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Install a global fmt subscriber filtering at `level` unless `RUST_LOG` is set.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow!("Invalid log level '{}': {}", level, e))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize tracing: {}", e))
}

/// Install the subscriber using the level from `settings`.
pub fn init_from_settings(settings: &Settings) -> Result<()> {
    init_tracing(&settings.log_level)
}
