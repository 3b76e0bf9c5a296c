//! Error types for telemetry operations.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use prometheus::Error as PrometheusError;
use tracing_subscriber::filter::ParseError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised while setting up logging or exporting metrics.
#[derive(Debug)]
pub enum TelemetryError {
    /// `FLOWRELAY_LOG_FORMAT` or `--log-format` named an unknown format.
    InvalidLogFormat {
        /// Raw value as supplied.
        value: String,
    },
    /// `RUST_LOG` or the configured level could not be parsed as filter directives.
    InvalidFilter {
        /// Directives that failed to parse.
        directives: String,
        /// Underlying directive parse error.
        source: ParseError,
    },
    /// Installing the tracing subscriber failed.
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// Building a run or transfer metric failed.
    MetricsCollector {
        /// Metric name.
        name: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// Registering a run or transfer metric failed.
    MetricsRegister {
        /// Metric name.
        name: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// Rendering the text exposition format failed.
    MetricsEncode {
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// Rendered metrics output was not valid UTF-8.
    MetricsUtf8 {
        /// Underlying UTF-8 conversion error.
        source: std::string::FromUtf8Error,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLogFormat { .. } => formatter.write_str("unknown log format"),
            Self::InvalidFilter { .. } => formatter.write_str("invalid log filter directives"),
            Self::SubscriberInstall { .. } => {
                formatter.write_str("failed to install tracing subscriber")
            }
            Self::MetricsCollector { .. } => formatter.write_str("failed to build run metric"),
            Self::MetricsRegister { .. } => formatter.write_str("failed to register run metric"),
            Self::MetricsEncode { .. } => formatter.write_str("failed to render metrics"),
            Self::MetricsUtf8 { .. } => formatter.write_str("metrics output was not valid utf-8"),
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidLogFormat { .. } => None,
            Self::InvalidFilter { source, .. } => Some(source),
            Self::SubscriberInstall { source } => Some(source),
            Self::MetricsCollector { source, .. }
            | Self::MetricsRegister { source, .. }
            | Self::MetricsEncode { source } => Some(source),
            Self::MetricsUtf8 { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::EnvFilter;

    #[test]
    fn configuration_errors_name_the_bad_input() -> std::result::Result<(), Box<dyn Error>> {
        let format = TelemetryError::InvalidLogFormat {
            value: "xml".to_string(),
        };
        assert_eq!(format.to_string(), "unknown log format");
        assert!(format.source().is_none());

        let source = EnvFilter::try_new("flowrelay=loud")
            .err()
            .ok_or("expected a directive parse error")?;
        let filter = TelemetryError::InvalidFilter {
            directives: "flowrelay=loud".to_string(),
            source,
        };
        assert_eq!(filter.to_string(), "invalid log filter directives");
        assert!(filter.source().is_some());
        Ok(())
    }

    #[test]
    fn metric_errors_keep_their_source() -> std::result::Result<(), Box<dyn Error>> {
        let utf8_error = String::from_utf8(vec![0, 159])
            .err()
            .ok_or("expected a utf-8 error")?;
        let cases = [
            (
                TelemetryError::MetricsCollector {
                    name: "flowrelay_runs_total",
                    source: PrometheusError::Msg("bad label".to_string()),
                },
                "failed to build run metric",
            ),
            (
                TelemetryError::MetricsRegister {
                    name: "flowrelay_runs_total",
                    source: PrometheusError::AlreadyReg,
                },
                "failed to register run metric",
            ),
            (
                TelemetryError::MetricsEncode {
                    source: PrometheusError::Msg("encode".to_string()),
                },
                "failed to render metrics",
            ),
            (
                TelemetryError::MetricsUtf8 { source: utf8_error },
                "metrics output was not valid utf-8",
            ),
        ];

        for (err, message) in cases {
            assert_eq!(err.to_string(), message);
            assert!(err.source().is_some());
        }
        Ok(())
    }
}
