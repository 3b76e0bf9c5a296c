//! Logging initialisation and configuration.
//!
//! # Design
//! - Centralises logging setup (fmt or JSON) with a single entry point.
//! - Records the build SHA once to avoid inconsistencies across modules.

use std::str::FromStr;

use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};

/// Default logging target when `RUST_LOG` is not provided.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable selecting the log output format.
pub const ENV_LOG_FORMAT: &str = "FLOWRELAY_LOG_FORMAT";

static BUILD_SHA: OnceCell<String> = OnceCell::new();

/// Configure and install the global tracing subscriber, writing to stderr.
///
/// # Errors
///
/// Returns an error if `RUST_LOG` or the configured level is not a valid filter,
/// or if the tracing subscriber cannot be installed (for example, because
/// another subscriber has already been set globally).
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let _ = BUILD_SHA.set(config.build_sha.to_string());

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = env_filter(rust_log.as_deref(), config.level)?;
    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .try_init(),
    }
    .map_err(|source| TelemetryError::SubscriberInstall { source })
}

/// Access the build SHA recorded during logging initialisation.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or("dev", String::as_str)
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Log level string (e.g., `info`, `debug`) used when `RUST_LOG` is unset.
    pub level: &'a str,
    /// Output format selection for the tracing subscriber.
    pub format: LogFormat,
    /// Build identifier recorded in structured logs.
    pub build_sha: &'a str,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
            build_sha: build_sha(),
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Emit logs as structured JSON objects.
    Json,
    /// Emit human-readable logs.
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }

}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            _ => Err(TelemetryError::InvalidLogFormat {
                value: value.to_string(),
            }),
        }
    }
}

/// Derive the log format from `FLOWRELAY_LOG_FORMAT`, if set and non-blank.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidLogFormat`] for unrecognised values.
pub fn log_format_from_env() -> Result<Option<LogFormat>> {
    log_format_from_value(std::env::var(ENV_LOG_FORMAT).ok().as_deref())
}

/// Map an optional raw value to a format; blank values count as unset.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidLogFormat`] for unrecognised values.
pub fn log_format_from_value(value: Option<&str>) -> Result<Option<LogFormat>> {
    value
        .filter(|raw| !raw.trim().is_empty())
        .map(str::parse)
        .transpose()
}

/// `RUST_LOG` directives take precedence over the configured level.
fn env_filter(rust_log: Option<&str>, level: &str) -> Result<EnvFilter> {
    let directives = rust_log
        .filter(|raw| !raw.trim().is_empty())
        .unwrap_or(level);
    EnvFilter::try_new(directives).map_err(|source| TelemetryError::InvalidFilter {
        directives: directives.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_from_value_parses_variants() -> Result<()> {
        assert_eq!(log_format_from_value(Some("json"))?, Some(LogFormat::Json));
        assert_eq!(log_format_from_value(Some(" Pretty "))?, Some(LogFormat::Pretty));
        assert_eq!(log_format_from_value(Some("  "))?, None);
        assert_eq!(log_format_from_value(None)?, None);
        assert!(matches!(
            log_format_from_value(Some("xml")),
            Err(TelemetryError::InvalidLogFormat { value }) if value == "xml"
        ));
        Ok(())
    }

    #[test]
    fn env_filter_prefers_rust_log_and_rejects_bad_directives() {
        assert!(env_filter(Some("flowrelay_engine=debug"), "info").is_ok());
        assert!(env_filter(Some(" "), "warn").is_ok());
        assert!(matches!(
            env_filter(None, "flowrelay=verbose"),
            Err(TelemetryError::InvalidFilter { directives, .. }) if directives == "flowrelay=verbose"
        ));
        assert!(matches!(
            env_filter(Some("flowrelay=notalevel"), "info"),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn init_logging_installs_subscriber_once() {
        let config = LoggingConfig {
            level: "info",
            format: LogFormat::Pretty,
            build_sha: "dev",
        };
        let _ = init_logging(&config);
        assert!(matches!(
            init_logging(&config),
            Err(TelemetryError::SubscriberInstall { .. })
        ));
    }
}
