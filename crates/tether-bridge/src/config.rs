use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use tether::{DEFAULT_MAX_CALL_DEPTH, Limits, repl::ReplOptions};

use crate::logging::DEFAULT_LOG_FILTER;

/// Line-delimited JSON bridge between an editor and tether sessions.
///
/// Reads one request per line on stdin and writes one result per line on
/// stdout. Diagnostics go to stderr.
#[derive(Debug, Clone, Parser)]
#[command(name = "tether-bridge", version)]
pub struct Config {
    /// Log filter directives, e.g. `tether_bridge=debug`.
    #[arg(long, env = "TETHER_LOG", value_name = "FILTER")]
    pub log_filter: Option<String>,

    #[arg(long, env = "TETHER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Script evaluated at start-up into the global environment; repeatable.
    #[arg(long = "prelude", env = "TETHER_PRELUDE", value_name = "FILE", value_delimiter = ',')]
    pub preludes: Vec<PathBuf>,

    /// Maximum nesting of function calls.
    #[arg(long, env = "TETHER_MAX_DEPTH", value_name = "N", default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    pub max_depth: usize,

    /// Time budget for one evaluation, in milliseconds.
    #[arg(long, env = "TETHER_TIMEOUT_MS", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Start sessions without a greeting.
    #[arg(long, env = "TETHER_NO_BANNER")]
    pub no_banner: bool,

    /// Name shown in session prompts.
    #[arg(long, env = "TETHER_PROMPT_NAME", value_name = "NAME", default_value = "tether")]
    pub prompt_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Config {
    /// Effective log filter.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    #[must_use]
    pub fn limits(&self) -> Limits {
        let limits = Limits::new().max_call_depth(self.max_depth);
        match self.timeout_ms {
            Some(ms) => limits.max_duration(Duration::from_millis(ms)),
            None => limits,
        }
    }

    #[must_use]
    pub fn repl_options(&self) -> ReplOptions {
        ReplOptions {
            banner: !self.no_banner,
            name: self.prompt_name.clone(),
        }
    }
}
