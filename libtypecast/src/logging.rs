//! Logging setup shared by the library and the `typecast` binary
//!
//! All output goes to stderr so stdout stays clean for JSON results.
//!
//! ```no_run
//! use libtypecast::logging::{LoggingConfig, LogFormat};
//!
//! LoggingConfig::new(LogFormat::Json, "info".to_string(), false).init();
//!
//! // Or honour TYPECAST_LOG_FORMAT / TYPECAST_LOG_LEVEL
//! libtypecast::logging::init_default();
//! ```

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

pub const LOG_FORMAT_ENV: &str = "TYPECAST_LOG_FORMAT";
pub const LOG_LEVEL_ENV: &str = "TYPECAST_LOG_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Plain text, no colors
    #[default]
    Text,
    /// One JSON object per line
    Json,
    /// Multi-line with colors, for development
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    /// Forces debug level unless `RUST_LOG` says otherwise
    pub verbose: bool,
}

impl LoggingConfig {
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
        }
    }

    /// Read format and level from the environment, defaulting to text/warn
    ///
    /// The default level is `warn` so a plain CLI run prints only results and
    /// actionable warnings such as a scheduling downgrade.
    pub fn from_env(verbose: bool) -> Self {
        let format = std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "warn".to_string());
        Self::new(format, level, verbose)
    }

    /// Filter directive used when `RUST_LOG` is not set
    pub fn directive(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.level
        }
    }

    /// Install the global subscriber
    ///
    /// Later calls are ignored, so tests and embedders may call this freely.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.directive()));

        let installed = match self.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .flatten_event(true)
                .with_current_span(true)
                .with_target(true)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(false)
                .with_level(true)
                .try_init(),
        };

        if installed.is_err() {
            tracing::debug!("Logging already initialized; keeping existing subscriber");
        }
    }
}

/// Initialize logging from `TYPECAST_LOG_FORMAT` and `TYPECAST_LOG_LEVEL`
pub fn init_default() {
    LoggingConfig::from_env(false).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);

        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(err.contains("Invalid log format: 'xml'"));
    }

    #[test]
    fn test_verbose_forces_debug() {
        let config = LoggingConfig::new(LogFormat::Text, "error".to_string(), true);
        assert_eq!(config.directive(), "debug");

        let quiet = LoggingConfig::new(LogFormat::Text, "error".to_string(), false);
        assert_eq!(quiet.directive(), "error");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var(LOG_FORMAT_ENV, "json");
        std::env::set_var(LOG_LEVEL_ENV, "info");
        let config = LoggingConfig::from_env(false);
        std::env::remove_var(LOG_FORMAT_ENV);
        std::env::remove_var(LOG_LEVEL_ENV);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        std::env::remove_var(LOG_FORMAT_ENV);
        std::env::remove_var(LOG_LEVEL_ENV);
        let config = LoggingConfig::from_env(false);
        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        let config = LoggingConfig::new(LogFormat::Text, "off".to_string(), false);
        config.init();
        config.init();
    }
}
