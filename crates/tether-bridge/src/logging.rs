//! Diagnostics on stderr; stdout carries protocol lines only.

use std::io::{self, IsTerminal};

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{Config, LogFormat};

pub const DEFAULT_LOG_FILTER: &str = "tether_bridge=info,tether=warn";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(String),
    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

/// Installs the global subscriber described by `config`.
pub fn init(config: &Config) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_new(config.log_filter()).map_err(|err| LoggingError::Filter(err.to_string()))?;
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(true);
    let installed = match config.log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    installed.map_err(|err| LoggingError::Install(err.to_string()))
}
