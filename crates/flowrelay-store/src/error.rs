//! Error types for execution record persistence.

use flowrelay_core::RunStatus;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures raised by execution record stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same identifier was already appended.
    #[error("execution record already exists")]
    Duplicate {
        /// Identifier of the rejected record.
        record_id: Uuid,
    },
    /// Only terminal records may be appended.
    #[error("execution record is not terminal")]
    NotTerminal {
        /// Identifier of the rejected record.
        record_id: Uuid,
        /// Status carried by the rejected record.
        status: RunStatus,
    },
    /// A database call failed.
    #[error("database operation failed")]
    Database {
        /// Operation being performed.
        operation: &'static str,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },
    /// Applying embedded migrations failed.
    #[error("database migration failed")]
    Migrate {
        /// Underlying migration error.
        #[source]
        source: sqlx::migrate::MigrateError,
    },
    /// A JSON column could not be encoded or decoded.
    #[error("execution record field could not be serialised")]
    Serialization {
        /// Column involved.
        field: &'static str,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// A stored row held a value outside the record's domain.
    #[error("stored execution record is invalid")]
    InvalidRow {
        /// Column involved.
        field: &'static str,
        /// Offending value.
        value: String,
    },
}
