//! Logging initialization for the warden workspace
//!
//! All crates log through `tracing` with structured key-value fields.
//! This module provides the shared level type and a one-shot subscriber
//! initialization used by binaries and integration tests.

use std::sync::Once;

use tracing::Level;
use tracing_subscriber::fmt;

/// Minimum log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    /// Parse log level from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" => Some(LogLevel::Warn),
            "ERROR" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn as_tracing_level(&self) -> Level {
        match self {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Logging configuration options
pub struct LogOptions {
    /// Minimum log level
    pub level: LogLevel,
    /// Include target module paths in output
    pub with_target: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            with_target: true,
        }
    }
}

static INIT: Once = Once::new();

/// Initialize the global tracing subscriber.
///
/// Safe to call multiple times; only the first call installs a subscriber,
/// so tests can initialize without coordinating.
pub fn init_logging(options: LogOptions) {
    INIT.call_once(|| {
        fmt()
            .with_max_level(options.level.as_tracing_level())
            .with_target(options.with_target)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_round_trip() {
        for level in [
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ] {
            assert_eq!(LogLevel::from_str(level.as_str()), Some(level));
        }
    }

    #[test]
    fn test_log_level_parse_case_insensitive() {
        assert_eq!(LogLevel::from_str("warn"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("unknown"), None);
    }

    #[test]
    fn test_init_logging_idempotent() {
        init_logging(LogOptions::default());
        init_logging(LogOptions {
            level: LogLevel::Debug,
            with_target: false,
        });
    }
}
