//! Structured logging
//!
//! Installs a `tracing` subscriber for the binary. The filter comes from
//! `GENTTY_LOG` when set, then `--log-level`, then [`DEFAULT_LEVEL`].

use crate::config::{Config, ConfigError};
use std::fs::OpenOptions;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable overriding every other level setting
pub const LOG_ENV: &str = "GENTTY_LOG";

pub const DEFAULT_LEVEL: &str = "warn";

/// Initialize the logging system for `config`
pub fn init(config: &Config) -> Result<(), ConfigError> {
    let filter = build_env_filter(config);
    let base_subscriber = Registry::default().with(filter);

    if let Some(path) = &config.log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::LogFile {
                path: path.clone(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| ConfigError::LogFile {
                path: path.clone(),
                source,
            })?;
        base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(file),
            )
            .try_init()
            .map_err(|e| ConfigError::Logger(e.to_string()))
    } else {
        base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| ConfigError::Logger(e.to_string()))
    }
}

fn build_env_filter(config: &Config) -> EnvFilter {
    // Nowhere to write while the UI holds the terminal
    if !config.logs_to_stderr() && config.log_file.is_none() {
        return EnvFilter::new("off");
    }
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return filter;
    }
    let level = config.log_level.as_deref().unwrap_or(DEFAULT_LEVEL);
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}
