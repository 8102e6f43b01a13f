//! Logging setup
//!
//! `RUST_LOG` wins when set. Otherwise `--verbose` selects DEBUG and the
//! configured level applies.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Resolve the default level from the config and the verbose flag
pub fn default_level(config: &LoggingConfig, verbose: bool) -> Result<Level> {
    if verbose {
        return Ok(Level::DEBUG);
    }
    config
        .level
        .parse::<Level>()
        .map_err(|_| anyhow::anyhow!("Invalid log level: {}", config.level))
}

/// Filter with `level` as the default directive, overridable by `RUST_LOG`
pub fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = default_level(config, verbose)?;
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(level));

    let installed = match config.format.as_str() {
        "pretty" => builder.pretty().try_init(),
        _ => builder.compact().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install subscriber: {}", e))
}
