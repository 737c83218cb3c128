//! Logging setup
//!
//! Installs the crate's `tracing` subscriber and names the span every test
//! runs inside, so phase and timeout events carry the test id.

use tracing::{Level, Span};
use tracing_subscriber::EnvFilter;

use crate::config::RunnerConfig;

/// Log level configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Level for a run: `--verbose` wins, then the configured level.
    ///
    /// An unknown configured level falls back to info.
    pub fn for_run(config: &RunnerConfig, verbose: bool) -> Self {
        if verbose {
            return LogLevel::Debug;
        }
        Self::from_str(&config.log_level).unwrap_or_default()
    }
}

/// Install the global subscriber; false if one was already installed
pub fn init_logger(level: LogLevel) -> bool {
    let filter = EnvFilter::new(format!("async_trial={}", level.to_tracing_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .is_ok()
}

/// Span wrapping everything logged while one test runs
pub fn test_span(test: &str) -> Span {
    tracing::info_span!("test", id = %test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("unknown"), None);
        assert_eq!(LogLevel::Debug.to_tracing_level(), Level::DEBUG);
    }

    #[test]
    fn test_level_for_run() {
        let config = RunnerConfig {
            log_level: "warn".to_string(),
            ..RunnerConfig::default()
        };
        assert_eq!(LogLevel::for_run(&config, false), LogLevel::Warn);
        assert_eq!(LogLevel::for_run(&config, true), LogLevel::Debug);

        let config = RunnerConfig {
            log_level: "loud".to_string(),
            ..RunnerConfig::default()
        };
        assert_eq!(LogLevel::for_run(&config, false), LogLevel::Info);
    }
}
