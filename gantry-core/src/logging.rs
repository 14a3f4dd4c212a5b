//! Logging setup for Gantry.
//!
//! A small builder over `tracing-subscriber`: pick a level, a format
//! (JSON by default), and an output, then call [`LogConfig::init`] and
//! keep the returned guard alive for the lifetime of the process.
//!
//! ```no_run
//! use gantry_core::logging::*;
//!
//! let _guard = LogConfig::new()
//!     .level(LogLevel::Debug)
//!     .format(LogFormat::Pretty)
//!     .init();
//!
//! info!("application started");
//! ```

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

// Re-export the macros the rest of the crate logs with.
pub use tracing::{debug, error, info, trace, warn};

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Output format for log records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON, one record per line (the default)
    Json,
    /// Human-readable multi-line format
    Pretty,
    /// Single-line format
    Compact,
}

/// Where log records are written
#[derive(Debug, Clone)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// A single file inside `directory`
    File { directory: String, name: String },
}

/// Logging configuration builder
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: LogLevel,
    format: LogFormat,
    output: LogOutput,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            output: LogOutput::Stdout,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Install the global subscriber and return the writer guard.
    ///
    /// `RUST_LOG` overrides the configured level when set. Installing a
    /// second subscriber is a no-op rather than a panic, so tests can
    /// call this repeatedly.
    pub fn init(self) -> WorkerGuard {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()));

        let (writer, guard) = match &self.output {
            LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
            LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
            LogOutput::File { directory, name } => {
                tracing_appender::non_blocking(tracing_appender::rolling::never(directory, name))
            }
        };

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer);

        match self.format {
            LogFormat::Json => {
                let _ = builder.json().try_init();
            }
            LogFormat::Pretty => {
                let _ = builder.pretty().try_init();
            }
            LogFormat::Compact => {
                let _ = builder.compact().try_init();
            }
        }

        guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Json);
        assert!(matches!(config.output, LogOutput::Stdout));
    }

    #[test]
    fn test_builder() {
        let config = LogConfig::new()
            .level(LogLevel::Trace)
            .format(LogFormat::Compact)
            .output(LogOutput::Stderr);
        assert_eq!(config.level, LogLevel::Trace);
        assert_eq!(config.format, LogFormat::Compact);
        assert!(matches!(config.output, LogOutput::Stderr));
    }

    #[test]
    fn test_level_strings() {
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(LogLevel::Error.as_str(), "error");
    }

    #[test]
    fn test_init_is_repeatable() {
        let _first = LogConfig::new().format(LogFormat::Compact).init();
        let _second = LogConfig::new().init();
        info!("still alive");
    }
}
