//! Run-level failures raised inside the engine.
//!
//! None of these escape [`crate::FlowEngine::run`]; each becomes the single
//! fatal entry of a failed execution record.

use flowrelay_config::ConfigError;
use flowrelay_core::ConnectorError;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures that abort a run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The flow id is unknown to the catalog.
    #[error("flow not found")]
    FlowNotFound {
        /// Requested flow.
        flow_id: Uuid,
    },
    /// The catalog failed for another reason.
    #[error("flow lookup failed")]
    FlowLookup {
        /// Requested flow.
        flow_id: Uuid,
        /// Underlying catalog error.
        #[source]
        source: ConfigError,
    },
    /// The connectivity provider could not supply connectors.
    #[error("connectors unavailable")]
    Connectors {
        /// Underlying connector error.
        #[source]
        source: ConnectorError,
    },
    /// A connectivity probe failed or timed out.
    #[error("connection failed")]
    ConnectionFailed {
        /// Service reported by the failing connector.
        service: String,
    },
    /// The destination container could not be resolved.
    #[error("destination unavailable")]
    Destination {
        /// Underlying connector error.
        #[source]
        source: ConnectorError,
    },
    /// The source could not list items.
    #[error("listing items failed")]
    Listing {
        /// Underlying connector error.
        #[source]
        source: ConnectorError,
    },
    /// The run was cancelled between items.
    #[error("run cancelled")]
    Cancelled,
    /// A spawned run task ended without producing a record.
    #[error("run task failed")]
    Join {
        /// Flow the task was running.
        flow_id: Uuid,
        /// Underlying join error.
        #[source]
        source: tokio::task::JoinError,
    },
}

impl EngineError {
    /// Single human-readable line stored in the failed record.
    #[must_use]
    pub fn record_message(&self) -> String {
        match self {
            Self::FlowNotFound { flow_id } => format!("flow {flow_id} not found"),
            Self::FlowLookup { flow_id, source } => {
                format!("failed to load flow {flow_id}: {source}")
            }
            Self::Connectors { source } => format!("{self}: {}", source.describe()),
            Self::ConnectionFailed { service } => format!("{service} connection failed"),
            Self::Destination { source } | Self::Listing { source } => source.describe(),
            Self::Cancelled => "run cancelled".to_string(),
            Self::Join { flow_id, source } => format!("{self} for flow {flow_id}: {source}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_messages_name_the_failure() {
        let flow_id = Uuid::nil();
        assert_eq!(
            EngineError::FlowNotFound { flow_id }.record_message(),
            format!("flow {flow_id} not found")
        );
        assert_eq!(
            EngineError::ConnectionFailed {
                service: "drive".into()
            }
            .record_message(),
            "drive connection failed"
        );
        assert_eq!(EngineError::Cancelled.record_message(), "run cancelled");
        let destination = EngineError::Destination {
            source: ConnectorError::DestinationUnavailable {
                path: "Inbox".into(),
                detail: "offline".into(),
            },
        };
        assert_eq!(
            destination.record_message(),
            "destination unavailable (Inbox: offline)"
        );
    }
}
