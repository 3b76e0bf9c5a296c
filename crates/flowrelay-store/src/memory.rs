//! In-process execution record store.

use std::collections::HashSet;

use async_trait::async_trait;
use flowrelay_core::ExecutionRecord;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::{ExecutionStore, ensure_terminal};

/// Append-only store kept in memory; safe for concurrent appends.
#[derive(Default)]
pub struct MemoryExecutionStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    ids: HashSet<Uuid>,
    records: Vec<ExecutionRecord>,
}

impl MemoryExecutionStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records appended so far.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Whether no record has been appended.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn append(&self, record: ExecutionRecord) -> StoreResult<()> {
        ensure_terminal(&record)?;
        let mut inner = self.inner.write().await;
        if !inner.ids.insert(record.id) {
            return Err(StoreError::Duplicate {
                record_id: record.id,
            });
        }
        inner.records.push(record);
        Ok(())
    }

    async fn list_by_flow(&self, flow_id: Uuid, limit: usize) -> StoreResult<Vec<ExecutionRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let inner = self.inner.read().await;
        let mut matching: Vec<(usize, &ExecutionRecord)> = inner
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.flow_id == flow_id)
            .collect();
        matching.sort_by(|(seq_a, a), (seq_b, b)| {
            b.started_at.cmp(&a.started_at).then(seq_b.cmp(seq_a))
        });
        Ok(matching
            .into_iter()
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect())
    }
}
