//! `PostgreSQL` execution record store.

use async_trait::async_trait;
use flowrelay_core::{ExecutionRecord, LogEntry, RunStatus};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row, types::Json};
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::{ExecutionStore, ensure_terminal};

const INSERT_RECORD_SQL: &str = r"
    INSERT INTO flowrelay.execution_records (
        id,
        flow_id,
        started_at,
        completed_at,
        status,
        items_processed,
        payloads_transferred,
        errors,
        logs
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
    ON CONFLICT (id) DO NOTHING
";

const SELECT_BY_FLOW_SQL: &str = r"
    SELECT
        id,
        flow_id,
        started_at,
        completed_at,
        status,
        items_processed,
        payloads_transferred,
        errors,
        logs
    FROM flowrelay.execution_records
    WHERE flow_id = $1
    ORDER BY started_at DESC, append_seq DESC
    LIMIT $2
";

/// Database-backed append-only store.
#[derive(Clone)]
pub struct PgExecutionStore {
    pool: PgPool,
}

impl PgExecutionStore {
    /// Initialise the store, applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail or the database is unreachable.
    pub async fn new(pool: PgPool) -> StoreResult<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|source| StoreError::Migrate { source })?;
        Ok(Self { pool })
    }

    /// Connect to `database_url` and initialise the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migrations fail.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|source| StoreError::Database {
                operation: "connect",
                source,
            })?;
        Self::new(pool).await
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ExecutionStore for PgExecutionStore {
    async fn append(&self, record: ExecutionRecord) -> StoreResult<()> {
        ensure_terminal(&record)?;
        let errors = serde_json::to_value(&record.errors).map_err(|source| {
            StoreError::Serialization {
                field: "errors",
                source,
            }
        })?;
        let logs = serde_json::to_value(&record.logs).map_err(|source| {
            StoreError::Serialization {
                field: "logs",
                source,
            }
        })?;

        let result = sqlx::query(INSERT_RECORD_SQL)
            .bind(record.id)
            .bind(record.flow_id)
            .bind(record.started_at)
            .bind(record.completed_at)
            .bind(record.status.as_str())
            .bind(count_to_db(record.items_processed))
            .bind(count_to_db(record.payloads_transferred))
            .bind(Json(errors))
            .bind(Json(logs))
            .execute(&self.pool)
            .await
            .map_err(|source| StoreError::Database {
                operation: "append",
                source,
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate {
                record_id: record.id,
            });
        }
        debug!(record_id = %record.id, flow_id = %record.flow_id, "execution record appended");
        Ok(())
    }

    async fn list_by_flow(&self, flow_id: Uuid, limit: usize) -> StoreResult<Vec<ExecutionRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(SELECT_BY_FLOW_SQL)
            .bind(flow_id)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|source| StoreError::Database {
                operation: "list_by_flow",
                source,
            })?;
        rows.iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: &PgRow) -> StoreResult<ExecutionRecord> {
    let column = |source| StoreError::Database {
        operation: "decode_row",
        source,
    };
    let status: String = row.try_get("status").map_err(column)?;
    let Json(errors): Json<Vec<String>> = row.try_get("errors").map_err(column)?;
    let Json(logs): Json<Vec<LogEntry>> = row.try_get("logs").map_err(column)?;
    Ok(ExecutionRecord {
        id: row.try_get("id").map_err(column)?,
        flow_id: row.try_get("flow_id").map_err(column)?,
        started_at: row.try_get("started_at").map_err(column)?,
        completed_at: row.try_get("completed_at").map_err(column)?,
        status: parse_status(&status)?,
        items_processed: count_from_db(
            "items_processed",
            row.try_get("items_processed").map_err(column)?,
        )?,
        payloads_transferred: count_from_db(
            "payloads_transferred",
            row.try_get("payloads_transferred").map_err(column)?,
        )?,
        errors,
        logs,
    })
}

fn parse_status(label: &str) -> StoreResult<RunStatus> {
    match label {
        "running" => Ok(RunStatus::Running),
        "completed" => Ok(RunStatus::Completed),
        "failed" => Ok(RunStatus::Failed),
        other => Err(StoreError::InvalidRow {
            field: "status",
            value: other.to_string(),
        }),
    }
}

fn count_to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn count_from_db(field: &'static str, value: i64) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::InvalidRow {
        field,
        value: value.to_string(),
    })
}
