//! Error types for configuration operations.
//!
//! # Design
//! - Constant messages; the offending field, value, or path travels as context.
//! - Source errors are preserved rather than interpolated.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// No flow is registered under the requested identifier.
    #[error("flow not found")]
    FlowNotFound {
        /// Identifier that was requested.
        flow_id: Uuid,
    },
    /// Two flows share the same identifier.
    #[error("duplicate flow identifier")]
    DuplicateFlow {
        /// Identifier that appeared more than once.
        flow_id: Uuid,
    },
    /// A flow definition failed validation.
    #[error("invalid flow definition")]
    InvalidFlow {
        /// Identifier of the offending flow.
        flow_id: Uuid,
        /// Underlying validation failure.
        #[source]
        source: Box<ConfigError>,
    },
    /// File system operation failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// JSON decoding failed.
    #[error("json decoding failed")]
    Json {
        /// Operation identifier.
        operation: &'static str,
        /// Path of the document being decoded.
        path: PathBuf,
        /// Source serde error.
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        field: &'static str,
        reason: &'static str,
        value: Option<impl Into<String>>,
    ) -> Self {
        Self::InvalidField {
            field,
            reason,
            value: value.map(Into::into),
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn invalid_flow_exposes_source() {
        let inner = ConfigError::invalid("name", "must not be empty", None::<String>);
        let err = ConfigError::InvalidFlow {
            flow_id: Uuid::nil(),
            source: Box::new(inner),
        };
        assert_eq!(err.to_string(), "invalid flow definition");
        let source = err.source().expect("source preserved");
        assert_eq!(source.to_string(), "invalid configuration field");
    }
}
