//! Execution records and the ledger that owns a record while its run is live.
//!
//! # Design
//! - A [`RunLedger`] is the only mutable handle to a running record.
//! - Finishing consumes the ledger, so a run reaches a terminal state once.
//! - Log entries are mirrored to `tracing` at the matching level.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run is in progress.
    Running,
    /// Every item was attempted; item-level errors may exist.
    Completed,
    /// A run-level failure aborted the run.
    Failed,
}

impl RunStatus {
    /// Snake-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether the status is final.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a record log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Routine progress.
    Info,
    /// Skips and non-fatal anomalies.
    Warn,
    /// Item-level or run-level failures.
    Error,
}

impl LogLevel {
    /// Lower-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Structured log line persisted with a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Time the entry was written.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
}

/// Audit entity describing one run of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Run identifier.
    pub id: Uuid,
    /// Flow that was run.
    pub flow_id: Uuid,
    /// Time the run started.
    pub started_at: DateTime<Utc>,
    /// Time the run reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: RunStatus,
    /// Items evaluated by the run.
    pub items_processed: u64,
    /// Attachments written to the destination.
    pub payloads_transferred: u64,
    /// Human-readable errors in the order they occurred.
    pub errors: Vec<String>,
    /// Structured log lines in processing order.
    pub logs: Vec<LogEntry>,
}

/// Mutable owner of a running [`ExecutionRecord`].
#[derive(Debug)]
pub struct RunLedger {
    record: ExecutionRecord,
}

impl RunLedger {
    /// Open a ledger for a fresh run starting now.
    #[must_use]
    pub fn start(flow_id: Uuid) -> Self {
        Self::with_id(Uuid::new_v4(), flow_id, Utc::now())
    }

    /// Open a ledger with explicit identity, mainly for deterministic tests.
    #[must_use]
    pub fn with_id(id: Uuid, flow_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            record: ExecutionRecord {
                id,
                flow_id,
                started_at,
                completed_at: None,
                status: RunStatus::Running,
                items_processed: 0,
                payloads_transferred: 0,
                errors: Vec::new(),
                logs: Vec::new(),
            },
        }
    }

    /// Run identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.record.id
    }

    /// Flow identifier.
    #[must_use]
    pub const fn flow_id(&self) -> Uuid {
        self.record.flow_id
    }

    /// Run start time.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.record.started_at
    }

    /// Read-only view of the in-progress record.
    #[must_use]
    pub const fn snapshot(&self) -> &ExecutionRecord {
        &self.record
    }

    /// Append an informational log entry.
    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message.into());
    }

    /// Append a warning log entry.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message.into());
    }

    /// Record an error: appended to `errors` and logged at error level.
    pub fn record_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.record.errors.push(message.clone());
        self.log(LogLevel::Error, message);
    }

    /// Count an evaluated item.
    pub fn item_processed(&mut self) {
        self.record.items_processed += 1;
    }

    /// Count a payload written to the destination.
    pub fn payload_transferred(&mut self) {
        self.record.payloads_transferred += 1;
    }

    /// Transition to [`RunStatus::Completed`].
    #[must_use]
    pub fn complete(mut self) -> ExecutionRecord {
        self.info(format!(
            "run completed: {} item(s) processed, {} payload(s) transferred, {} error(s)",
            self.record.items_processed,
            self.record.payloads_transferred,
            self.record.errors.len()
        ));
        self.finish(RunStatus::Completed)
    }

    /// Transition to [`RunStatus::Failed`] with a run-level error.
    #[must_use]
    pub fn fail(mut self, message: impl Into<String>) -> ExecutionRecord {
        self.record_error(message);
        self.finish(RunStatus::Failed)
    }

    fn finish(mut self, status: RunStatus) -> ExecutionRecord {
        self.record.status = status;
        self.record.completed_at = Some(Utc::now().max(self.record.started_at));
        self.record
    }

    fn log(&mut self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => info!(run_id = %self.record.id, "{message}"),
            LogLevel::Warn => warn!(run_id = %self.record.id, "{message}"),
            LogLevel::Error => error!(run_id = %self.record.id, "{message}"),
        }
        self.record.logs.push(LogEntry {
            timestamp: Utc::now(),
            level,
            message,
        });
    }
}
