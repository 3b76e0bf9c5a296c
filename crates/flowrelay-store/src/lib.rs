#![forbid(unsafe_code)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Append-only persistence for execution records.
//!
//! Layout: `memory.rs` (in-process store), `postgres.rs` (`sqlx` store with
//! embedded migrations), `error.rs` (error types).

use async_trait::async_trait;
use flowrelay_core::ExecutionRecord;
use uuid::Uuid;

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryExecutionStore;
pub use postgres::PgExecutionStore;

/// Run history shared by every concurrent run.
///
/// The store exposes no update or delete operations.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Persist a terminal record.
    ///
    /// Returns [`StoreError::Duplicate`] when the record id was already appended.
    async fn append(&self, record: ExecutionRecord) -> StoreResult<()>;

    /// Records for `flow_id`, most recent first, at most `limit` of them.
    async fn list_by_flow(&self, flow_id: Uuid, limit: usize) -> StoreResult<Vec<ExecutionRecord>>;
}

pub(crate) fn ensure_terminal(record: &ExecutionRecord) -> StoreResult<()> {
    if record.status.is_terminal() {
        Ok(())
    } else {
        Err(StoreError::NotTerminal {
            record_id: record.id,
            status: record.status,
        })
    }
}
