//! Command-line configuration
//!
//! [`Cli`] is the raw clap surface; [`Config`] is what the rest of the
//! program consumes once the arguments have been checked.

use crate::interpreter::constants::DEFAULT_TRACE_LIMIT;
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

/// Step through the generators of a script, one drive at a time
#[derive(Parser, Debug, Clone)]
#[command(name = "gentty")]
#[command(about = "Run a script and replay every generator drive in a terminal UI")]
#[command(version)]
pub struct Cli {
    /// Script to run
    pub file: PathBuf,

    /// Run the script and print its output instead of opening the UI
    #[arg(long)]
    pub headless: bool,

    /// Maximum number of generator drives kept for replay
    #[arg(long, default_value_t = DEFAULT_TRACE_LIMIT)]
    pub trace_limit: usize,

    /// Log level or filter directive (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("file '{}' not found", .0.display())]
    MissingFile(PathBuf),

    #[error("--trace-limit must be at least 1")]
    ZeroTraceLimit,

    #[error("failed to open log file '{}': {source}", .path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install logger: {0}")]
    Logger(String),
}

/// Validated run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub file: PathBuf,
    pub headless: bool,
    pub trace_limit: usize,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        if !cli.file.is_file() {
            return Err(ConfigError::MissingFile(cli.file));
        }
        if cli.trace_limit == 0 {
            return Err(ConfigError::ZeroTraceLimit);
        }
        Ok(Config {
            file: cli.file,
            headless: cli.headless,
            trace_limit: cli.trace_limit,
            log_level: cli.log_level,
            log_file: cli.log_file,
        })
    }

    /// Whether log lines may go to stderr. The UI owns the terminal otherwise.
    pub fn logs_to_stderr(&self) -> bool {
        self.headless && self.log_file.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["gentty", "script.py"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("script.py"));
        assert!(!cli.headless);
        assert_eq!(cli.trace_limit, DEFAULT_TRACE_LIMIT);
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let cli = Cli::try_parse_from(["gentty", "/definitely/not/here.py"]).unwrap();
        assert!(matches!(
            Config::from_cli(cli),
            Err(ConfigError::MissingFile(_))
        ));
    }

    #[test]
    fn test_file_is_required() {
        assert!(Cli::try_parse_from(["gentty"]).is_err());
    }
}
