//! Connector error taxonomy.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result alias for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Failures reported by source and destination connectors.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The backing service could not be reached.
    #[error("service unreachable")]
    Unreachable {
        /// Service name reported by the connector.
        service: String,
        /// Additional context from the connector.
        detail: String,
    },
    /// An attachment disappeared or became inaccessible after listing.
    #[error("payload unavailable")]
    PayloadUnavailable {
        /// Source item identifier.
        item_id: String,
        /// Attachment identifier within the item.
        attachment_id: String,
        /// Additional context from the connector.
        detail: String,
    },
    /// The destination rejected a write.
    #[error("transfer failed")]
    TransferError {
        /// Operation that failed.
        operation: &'static str,
        /// Additional context from the connector.
        detail: String,
    },
    /// The destination could not resolve or create a container.
    #[error("destination unavailable")]
    DestinationUnavailable {
        /// Container path being resolved.
        path: String,
        /// Additional context from the connector.
        detail: String,
    },
    /// A connector call exceeded its deadline.
    #[error("connector call timed out")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Deadline that elapsed.
        after: Duration,
    },
    /// Filesystem access failed inside a connector.
    #[error("connector io failure")]
    Io {
        /// Operation that failed.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl ConnectorError {
    /// Short label used for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "unreachable",
            Self::PayloadUnavailable { .. } => "payload_unavailable",
            Self::TransferError { .. } => "transfer_error",
            Self::DestinationUnavailable { .. } => "destination_unavailable",
            Self::Timeout { .. } => "timeout",
            Self::Io { .. } => "io",
        }
    }

    /// Render the error together with its context for human-readable logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Unreachable { service, detail } => format!("{self} ({service}: {detail})"),
            Self::PayloadUnavailable {
                item_id,
                attachment_id,
                detail,
            } => format!("{self} (item {item_id}, attachment {attachment_id}: {detail})"),
            Self::TransferError { operation, detail } => {
                format!("{self} ({operation}: {detail})")
            }
            Self::DestinationUnavailable { path, detail } => {
                format!("{self} ({path}: {detail})")
            }
            Self::Timeout { operation, after } => {
                format!("{self} ({operation} after {}ms)", after.as_millis())
            }
            Self::Io {
                operation,
                path,
                source,
            } => format!("{self} ({operation} {}: {source})", path.display()),
        }
    }

    /// Map any failure during container resolution onto [`ConnectorError::DestinationUnavailable`].
    #[must_use]
    pub fn into_destination_unavailable(self, path: &str) -> Self {
        match self {
            Self::DestinationUnavailable { .. } => self,
            other => Self::DestinationUnavailable {
                path: path.to_string(),
                detail: other.describe(),
            },
        }
    }
}
