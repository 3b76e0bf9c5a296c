//! # Design
//!
//! - Centralize application-level errors for bootstrap and command dispatch.
//! - Keep error messages constant while carrying context fields for debugging.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable was missing or empty.
    #[error("missing environment configuration")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: &'static str,
    },
    /// Flow catalog or engine settings could not be loaded.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: flowrelay_config::ConfigError,
    },
    /// The execution record store failed.
    #[error("execution store operation failed")]
    Store {
        /// Operation identifier.
        operation: &'static str,
        /// Source store error.
        source: flowrelay_store::StoreError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: flowrelay_telemetry::TelemetryError,
    },
    /// A spawned run could not be joined.
    #[error("engine operation failed")]
    Engine {
        /// Operation identifier.
        operation: &'static str,
        /// Source engine error.
        source: flowrelay_engine::EngineError,
    },
    /// Command output could not be serialised.
    #[error("output serialization failed")]
    Output {
        /// Operation identifier.
        operation: &'static str,
        /// Source JSON error.
        source: serde_json::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: flowrelay_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn store(operation: &'static str, source: flowrelay_store::StoreError) -> Self {
        Self::Store { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: flowrelay_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn output(operation: &'static str, source: serde_json::Error) -> Self {
        Self::Output { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use uuid::Uuid;

    #[test]
    fn messages_are_constant_and_sources_preserved() {
        let missing = AppError::MissingEnv {
            name: "FLOWRELAY_SPOOL_DIR",
        };
        assert_eq!(missing.to_string(), "missing environment configuration");
        assert!(missing.source().is_none());

        let flow_id = Uuid::nil();
        let err = AppError::config(
            "flow_catalog.load",
            flowrelay_config::ConfigError::FlowNotFound { flow_id },
        );
        assert_eq!(err.to_string(), "configuration operation failed");
        assert!(err.source().is_some());
    }
}
