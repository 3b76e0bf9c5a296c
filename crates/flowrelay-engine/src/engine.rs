//! Execution orchestrator: drives one run from flow lookup to a persisted record.
//!
//! # Design
//! - Explicit stages (`preflight` → `resolve_destination` → `list_items` →
//!   `process_items` → `finalise`), each tracked in metrics.
//! - Item-level failures become record entries where they occur; only
//!   run-level failures abort, and even those end in a persisted record.
//! - Items run sequentially with a cancellation check between them; the
//!   attachments of one item are transferred with bounded parallelism and
//!   applied to the record in listing order.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use flowrelay_config::{ConfigError, EngineSettings, FlowCatalog, FlowConfig};
use flowrelay_core::{
    Attachment, CandidateItem, ConnectorError, ConnectorProvider, ConnectorResult, ConnectorSet,
    DestinationContainer, ExecutionRecord, RunLedger, RunStatus, SourceQuery, UploadRequest,
    UploadedFile,
};
use flowrelay_events::{Event, EventBus};
use flowrelay_store::ExecutionStore;
use flowrelay_telemetry::{Metrics, run_span};
use futures::{FutureExt, StreamExt, stream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::filter::{eligible_attachments, matches};
use crate::path::{PathContext, ensure_exists, resolve, template_for};
use crate::step::{RunStep, StepStatus};

/// Collaborators injected into a [`FlowEngine`].
pub struct EngineDeps {
    /// Flow definitions.
    pub catalog: Arc<dyn FlowCatalog>,
    /// Authenticated connectors per flow.
    pub connectors: Arc<dyn ConnectorProvider>,
    /// Run history.
    pub store: Arc<dyn ExecutionStore>,
    /// Lifecycle event sink.
    pub events: EventBus,
    /// Metrics registry.
    pub metrics: Metrics,
    /// Concurrency and timeout limits.
    pub settings: EngineSettings,
}

/// Runs flows and records the outcome of every run.
#[derive(Clone)]
pub struct FlowEngine {
    inner: Arc<EngineDeps>,
}

/// Handle to a run executing on its own task.
pub struct RunHandle {
    flow_id: Uuid,
    cancel: CancellationToken,
    task: JoinHandle<ExecutionRecord>,
}

impl RunHandle {
    /// Flow the run belongs to.
    #[must_use]
    pub const fn flow_id(&self) -> Uuid {
        self.flow_id
    }

    /// Request cooperative cancellation; the run stops before its next item.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the terminal record.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Join`] if the task was aborted.
    pub async fn join(self) -> EngineResult<ExecutionRecord> {
        let flow_id = self.flow_id;
        self.task
            .await
            .map_err(|source| EngineError::Join { flow_id, source })
    }
}

struct RunContext<'a> {
    run_id: Uuid,
    flow: &'a FlowConfig,
    connectors: &'a ConnectorSet,
    container: &'a DestinationContainer,
}

#[derive(Clone, Copy)]
enum TransferStage {
    Fetch,
    Upload,
}

impl TransferStage {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Upload => "upload",
        }
    }
}

enum AttachmentOutcome<'a> {
    Oversized {
        attachment: &'a Attachment,
        size: u64,
        limit: u64,
    },
    Failed {
        attachment: &'a Attachment,
        stage: TransferStage,
        error: ConnectorError,
    },
    Uploaded {
        attachment: &'a Attachment,
        file: UploadedFile,
    },
}

impl FlowEngine {
    /// Build an engine from its collaborators.
    #[must_use]
    pub fn new(deps: EngineDeps) -> Self {
        Self {
            inner: Arc::new(deps),
        }
    }

    /// Shared event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Shared metrics registry.
    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    /// Engine limits.
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.inner.settings
    }

    /// Execute one run of `flow_id` to completion.
    ///
    /// Never fails: every outcome, including unknown flows, panics inside
    /// connectors, and cancellation, is reported through the returned record,
    /// which has already been offered to the store.
    pub async fn run(&self, flow_id: Uuid, cancel: CancellationToken) -> ExecutionRecord {
        let ledger = RunLedger::start(flow_id);
        let span = run_span(ledger.id(), flow_id);
        self.execute(ledger, cancel).instrument(span).await
    }

    /// Run `flow_id` on its own task.
    #[must_use]
    pub fn spawn(&self, flow_id: Uuid) -> RunHandle {
        self.spawn_with_token(flow_id, CancellationToken::new())
    }

    /// Run `flow_id` on its own task, cancelled through `cancel`.
    #[must_use]
    pub fn spawn_with_token(&self, flow_id: Uuid, cancel: CancellationToken) -> RunHandle {
        let engine = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { engine.run(flow_id, token).await });
        RunHandle {
            flow_id,
            cancel,
            task,
        }
    }

    async fn execute(&self, mut ledger: RunLedger, cancel: CancellationToken) -> ExecutionRecord {
        let started = Instant::now();
        let metrics = &self.inner.metrics;
        metrics.run_started();
        self.publish(Event::RunStarted {
            run_id: ledger.id(),
            flow_id: ledger.flow_id(),
        });

        let outcome = AssertUnwindSafe(self.pipeline(&mut ledger, &cancel))
            .catch_unwind()
            .await;
        let record = match outcome {
            Ok(Ok(())) => ledger.complete(),
            Ok(Err(err)) => {
                let message = err.record_message();
                ledger.fail(message)
            }
            Err(panic) => ledger.fail(format!(
                "run aborted unexpectedly: {}",
                panic_message(panic.as_ref())
            )),
        };

        metrics.run_finished(started.elapsed());
        metrics.inc_run(record.status.as_str());
        self.publish(terminal_event(&record));
        self.persist(&record).await;
        record
    }

    async fn pipeline(&self, ledger: &mut RunLedger, cancel: &CancellationToken) -> EngineResult<()> {
        let (flow, connectors) = self.step(RunStep::Preflight, self.preflight(ledger)).await?;
        let container = self
            .step(
                RunStep::ResolveDestination,
                self.resolve_destination(ledger, &flow, &connectors),
            )
            .await?;
        let items = self
            .step(RunStep::ListItems, self.list_items(ledger, &flow, &connectors))
            .await?;

        let run = RunContext {
            run_id: ledger.id(),
            flow: &flow,
            connectors: &connectors,
            container: &container,
        };
        self.step(
            RunStep::ProcessItems,
            self.process_items(ledger, &run, &items, cancel),
        )
        .await
    }

    async fn preflight(&self, ledger: &mut RunLedger) -> EngineResult<(FlowConfig, ConnectorSet)> {
        let flow_id = ledger.flow_id();
        let flow = self
            .inner
            .catalog
            .get_flow(flow_id)
            .await
            .map_err(|source| match source {
                ConfigError::FlowNotFound { flow_id } => EngineError::FlowNotFound { flow_id },
                source => EngineError::FlowLookup { flow_id, source },
            })?;
        ledger.info(format!("run started for flow \"{}\"", flow.name));

        let connectors = self
            .inner
            .connectors
            .connectors(&flow)
            .await
            .map_err(|source| EngineError::Connectors { source })?;

        let limit = self.inner.settings.setup_timeout;
        let (source_ok, destination_ok) = tokio::join!(
            probe(limit, connectors.source.test_connection()),
            probe(limit, connectors.destination.test_connection()),
        );
        if !source_ok {
            return Err(EngineError::ConnectionFailed {
                service: connectors.source.service_name().to_string(),
            });
        }
        if !destination_ok {
            return Err(EngineError::ConnectionFailed {
                service: connectors.destination.service_name().to_string(),
            });
        }
        ledger.info(format!(
            "connected to {} and {}",
            connectors.source.service_name(),
            connectors.destination.service_name()
        ));
        Ok((flow, connectors))
    }

    async fn resolve_destination(
        &self,
        ledger: &mut RunLedger,
        flow: &FlowConfig,
        connectors: &ConnectorSet,
    ) -> EngineResult<DestinationContainer> {
        let context = PathContext {
            flow_name: &flow.name,
            timestamp: ledger.started_at(),
        };
        let path = resolve(template_for(flow), &context);
        let container = with_timeout(
            self.inner.settings.setup_timeout,
            "ensure_exists",
            ensure_exists(connectors.destination.as_ref(), &path),
        )
        .await
        .map_err(|source| EngineError::Destination {
            source: source.into_destination_unavailable(&path),
        })?;
        ledger.info(format!("destination resolved: {}", container.path));
        Ok(container)
    }

    async fn list_items(
        &self,
        ledger: &mut RunLedger,
        flow: &FlowConfig,
        connectors: &ConnectorSet,
    ) -> EngineResult<Vec<CandidateItem>> {
        let query = SourceQuery::from_filter(&flow.filter);
        let items = with_timeout(
            self.inner.settings.setup_timeout,
            "list",
            connectors.source.list(&query),
        )
        .await
        .map_err(|source| EngineError::Listing { source })?;
        ledger.info(format!("{} candidate item(s) listed", items.len()));
        Ok(items)
    }

    async fn process_items(
        &self,
        ledger: &mut RunLedger,
        run: &RunContext<'_>,
        items: &[CandidateItem],
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        for item in items {
            if cancel.is_cancelled() {
                ledger.warn(format!(
                    "cancellation requested after {} item(s)",
                    ledger.snapshot().items_processed
                ));
                return Err(EngineError::Cancelled);
            }
            self.process_item(ledger, run, item).await;
        }
        Ok(())
    }

    async fn process_item(&self, ledger: &mut RunLedger, run: &RunContext<'_>, item: &CandidateItem) {
        if !matches(item, &run.flow.filter) {
            self.skip_item(ledger, run, item, "does not match the trigger filter");
            return;
        }
        let eligible = eligible_attachments(item, &run.flow.filter);
        if eligible.is_empty() {
            self.skip_item(ledger, run, item, "no eligible attachments");
            return;
        }
        ledger.info(format!(
            "processing item {} ({} attachment(s))",
            item.id,
            eligible.len()
        ));

        let transfers: Vec<_> = eligible
            .into_iter()
            .map(|attachment| self.transfer(run, item, attachment))
            .collect();
        // Outcomes are applied as they complete so a later panic keeps earlier counts.
        let mut outcomes =
            stream::iter(transfers).buffered(self.inner.settings.attachment_concurrency.max(1));
        while let Some(outcome) = outcomes.next().await {
            self.apply(ledger, run, item, outcome);
        }
        ledger.item_processed();
    }

    async fn transfer<'a>(
        &self,
        run: &RunContext<'_>,
        item: &CandidateItem,
        attachment: &'a Attachment,
    ) -> AttachmentOutcome<'a> {
        let limit = run.flow.max_payload_bytes;
        if attachment.size_bytes > limit {
            return AttachmentOutcome::Oversized {
                attachment,
                size: attachment.size_bytes,
                limit,
            };
        }

        let deadline = self.inner.settings.connector_timeout;
        let payload = match with_timeout(
            deadline,
            "fetch_payload",
            run.connectors.source.fetch_payload(&item.id, &attachment.id),
        )
        .await
        {
            Ok(payload) => payload,
            Err(error) => {
                return AttachmentOutcome::Failed {
                    attachment,
                    stage: TransferStage::Fetch,
                    error,
                };
            }
        };
        let fetched = u64::try_from(payload.len()).unwrap_or(u64::MAX);
        if fetched > limit {
            return AttachmentOutcome::Oversized {
                attachment,
                size: fetched,
                limit,
            };
        }

        let request = UploadRequest {
            container_id: run.container.id.clone(),
            filename: attachment.filename.clone(),
            mime_type: attachment.mime_type.clone(),
            payload,
            policy: run.flow.duplicate_policy,
        };
        match with_timeout(deadline, "upload", run.connectors.destination.upload(request)).await {
            Ok(file) => AttachmentOutcome::Uploaded { attachment, file },
            Err(error) => AttachmentOutcome::Failed {
                attachment,
                stage: TransferStage::Upload,
                error,
            },
        }
    }

    fn apply(
        &self,
        ledger: &mut RunLedger,
        run: &RunContext<'_>,
        item: &CandidateItem,
        outcome: AttachmentOutcome<'_>,
    ) {
        match outcome {
            AttachmentOutcome::Oversized {
                attachment,
                size,
                limit,
            } => {
                let message = format!(
                    "{} in item {} is {size} bytes, exceeding the {limit} byte limit",
                    attachment.filename, item.id
                );
                self.inner.metrics.inc_item_error("oversized");
                self.attachment_failed(ledger, run, item, attachment, message);
            }
            AttachmentOutcome::Failed {
                attachment,
                stage,
                error,
            } => {
                let message = format!(
                    "failed to {} {} in item {}: {}",
                    stage.as_str(),
                    attachment.filename,
                    item.id,
                    error.describe()
                );
                self.inner.metrics.inc_item_error(error.kind());
                self.attachment_failed(ledger, run, item, attachment, message);
            }
            AttachmentOutcome::Uploaded { attachment, file } if file.disposition.wrote_payload() => {
                ledger.payload_transferred();
                self.inner.metrics.record_transfer(file.size_bytes);
                ledger.info(format!(
                    "transferred {} to {}/{} ({})",
                    attachment.filename, run.container.path, file.name, file.disposition
                ));
                self.publish(Event::PayloadTransferred {
                    run_id: run.run_id,
                    item_id: item.id.clone(),
                    filename: file.name,
                    size_bytes: file.size_bytes,
                });
            }
            AttachmentOutcome::Uploaded { attachment, file } => {
                ledger.info(format!(
                    "skipped {}: {} already exists in {}",
                    attachment.filename, file.name, run.container.path
                ));
            }
        }
    }

    fn attachment_failed(
        &self,
        ledger: &mut RunLedger,
        run: &RunContext<'_>,
        item: &CandidateItem,
        attachment: &Attachment,
        message: String,
    ) {
        self.publish(Event::AttachmentFailed {
            run_id: run.run_id,
            item_id: item.id.clone(),
            filename: attachment.filename.clone(),
            message: message.clone(),
        });
        ledger.record_error(message);
    }

    fn skip_item(&self, ledger: &mut RunLedger, run: &RunContext<'_>, item: &CandidateItem, reason: &str) {
        ledger.info(format!("skipped item {}: {reason}", item.id));
        self.publish(Event::ItemSkipped {
            run_id: run.run_id,
            item_id: item.id.clone(),
            reason: reason.to_string(),
        });
    }

    async fn persist(&self, record: &ExecutionRecord) {
        self.mark_step(RunStep::Finalise, StepStatus::Started);
        match self.inner.store.append(record.clone()).await {
            Ok(()) => {
                self.mark_step(RunStep::Finalise, StepStatus::Completed);
                debug!(record_id = %record.id, status = record.status.as_str(), "execution record persisted");
            }
            Err(err) => {
                self.mark_step(RunStep::Finalise, StepStatus::Failed);
                self.inner.metrics.inc_store_failure();
                error!(
                    error = %err,
                    record_id = %record.id,
                    flow_id = %record.flow_id,
                    "failed to persist execution record"
                );
            }
        }
    }

    async fn step<T, F>(&self, step: RunStep, work: F) -> EngineResult<T>
    where
        F: Future<Output = EngineResult<T>>,
    {
        self.mark_step(step, StepStatus::Started);
        let result = work.await;
        let status = if result.is_ok() {
            StepStatus::Completed
        } else {
            StepStatus::Failed
        };
        self.mark_step(step, status);
        result
    }

    fn mark_step(&self, step: RunStep, status: StepStatus) {
        debug!(step = step.as_str(), status = status.as_str(), "run step");
        self.inner
            .metrics
            .inc_run_step(step.as_str(), status.as_str());
    }

    fn publish(&self, event: Event) {
        self.inner.metrics.inc_event(event.kind());
        self.inner.events.publish(event);
    }
}

fn terminal_event(record: &ExecutionRecord) -> Event {
    match record.status {
        RunStatus::Completed => Event::RunCompleted {
            run_id: record.id,
            flow_id: record.flow_id,
            items_processed: record.items_processed,
            payloads_transferred: record.payloads_transferred,
            error_count: record.errors.len(),
        },
        RunStatus::Failed | RunStatus::Running => Event::RunFailed {
            run_id: record.id,
            flow_id: record.flow_id,
            message: record.errors.last().cloned().unwrap_or_default(),
        },
    }
}

async fn probe<F>(limit: Duration, check: F) -> bool
where
    F: Future<Output = bool>,
{
    tokio::time::timeout(limit, check).await.unwrap_or(false)
}

async fn with_timeout<T, F>(limit: Duration, operation: &'static str, call: F) -> ConnectorResult<T>
where
    F: Future<Output = ConnectorResult<T>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| {
            Err(ConnectorError::Timeout {
                operation,
                after: limit,
            })
        })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flowrelay_config::{DuplicatePolicy, MemoryFlowCatalog};
    use flowrelay_core::StaticConnectors;
    use flowrelay_store::{MemoryExecutionStore, StoreError, StoreResult};
    use flowrelay_test_support::fixtures::{attachment, flow, item};
    use flowrelay_test_support::mocks::{MemoryDestination, MemorySource};

    struct Harness {
        engine: FlowEngine,
        flow: FlowConfig,
        source: Arc<MemorySource>,
        destination: Arc<MemoryDestination>,
    }

    fn harness_with(flow: FlowConfig, settings: EngineSettings, store: Arc<dyn ExecutionStore>) -> Harness {
        let source = Arc::new(MemorySource::new("mail"));
        let destination = Arc::new(MemoryDestination::new("drive"));
        let catalog = MemoryFlowCatalog::new([flow.clone()]).expect("valid flow");
        let engine = FlowEngine::new(EngineDeps {
            catalog: Arc::new(catalog),
            connectors: Arc::new(StaticConnectors::new(ConnectorSet::new(
                source.clone(),
                destination.clone(),
            ))),
            store,
            events: EventBus::new(),
            metrics: Metrics::new().expect("metrics"),
            settings,
        });
        Harness {
            engine,
            flow,
            source,
            destination,
        }
    }

    fn harness(flow: FlowConfig) -> Harness {
        harness_with(flow, EngineSettings::default(), Arc::new(MemoryExecutionStore::new()))
    }

    #[tokio::test]
    async fn unknown_flow_yields_persisted_failure() -> StoreResult<()> {
        let store = Arc::new(MemoryExecutionStore::new());
        let harness = harness_with(flow("known"), EngineSettings::default(), store.clone());
        let missing = Uuid::new_v4();
        let record = harness.engine.run(missing, CancellationToken::new()).await;
        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.errors, vec![format!("flow {missing} not found")]);
        assert_eq!(store.list_by_flow(missing, 5).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn panics_in_connectors_fail_the_run_with_partial_counts() {
        let harness = harness(flow("panics"));
        harness
            .source
            .push_item(item("m1", "a@x", "one", vec![attachment("a1", "ok.txt", 3)]));
        harness
            .source
            .push_item(item("m2", "a@x", "two", vec![attachment("a2", "boom.txt", 3)]));
        harness.source.panic_on_fetch("a2");

        let record = harness
            .engine
            .run(harness.flow.id, CancellationToken::new())
            .await;
        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.items_processed, 1);
        assert_eq!(record.payloads_transferred, 1);
        assert!(record.errors.last().is_some_and(|e| e.contains("injected panic")));
    }

    #[tokio::test]
    async fn attachment_timeouts_are_isolated() {
        let settings = EngineSettings {
            connector_timeout: Duration::from_millis(20),
            ..EngineSettings::default()
        };
        let harness = harness_with(
            flow("slow"),
            settings,
            Arc::new(MemoryExecutionStore::new()),
        );
        harness
            .source
            .push_item(item("m1", "a@x", "slow", vec![attachment("a1", "late.txt", 3)]));
        harness.source.set_fetch_delay(Duration::from_millis(200));

        let record = harness
            .engine
            .run(harness.flow.id, CancellationToken::new())
            .await;
        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(record.items_processed, 1);
        assert_eq!(record.payloads_transferred, 0);
        assert_eq!(record.errors.len(), 1);
        assert!(record.errors[0].contains("timed out"));
    }

    #[tokio::test]
    async fn skipped_duplicates_are_not_counted_as_transfers() {
        let mut config = flow("dupes");
        config.duplicate_policy = DuplicatePolicy::Skip;
        let harness = harness(config);
        harness
            .source
            .push_item(item("m1", "a@x", "s", vec![attachment("a1", "same.txt", 3)]));

        let first = harness
            .engine
            .run(harness.flow.id, CancellationToken::new())
            .await;
        assert_eq!(first.payloads_transferred, 1);
        let second = harness
            .engine
            .run(harness.flow.id, CancellationToken::new())
            .await;
        assert_eq!(second.status, RunStatus::Completed);
        assert_eq!(second.payloads_transferred, 0);
        assert!(second.errors.is_empty());
        assert!(second
            .logs
            .iter()
            .any(|entry| entry.message.contains("already exists")));
    }

    #[tokio::test]
    async fn attachments_are_applied_in_listing_order() {
        let settings = EngineSettings {
            attachment_concurrency: 3,
            ..EngineSettings::default()
        };
        let harness = harness_with(flow("order"), settings, Arc::new(MemoryExecutionStore::new()));
        harness.source.push_item(item(
            "m1",
            "a@x",
            "s",
            vec![
                attachment("a1", "first.txt", 1),
                attachment("a2", "second.txt", 1),
                attachment("a3", "third.txt", 1),
            ],
        ));
        harness.destination.fail_uploads_of("second.txt");

        let record = harness
            .engine
            .run(harness.flow.id, CancellationToken::new())
            .await;
        let mentions: Vec<_> = record
            .logs
            .iter()
            .filter_map(|entry| {
                ["first.txt", "second.txt", "third.txt"]
                    .into_iter()
                    .find(|name| entry.message.contains(name))
            })
            .collect();
        assert_eq!(mentions, vec!["first.txt", "second.txt", "third.txt"]);
        assert_eq!(record.payloads_transferred, 2);
        assert_eq!(record.errors.len(), 1);
    }

    struct RejectingStore;

    #[async_trait]
    impl ExecutionStore for RejectingStore {
        async fn append(&self, record: ExecutionRecord) -> StoreResult<()> {
            Err(StoreError::Duplicate {
                record_id: record.id,
            })
        }

        async fn list_by_flow(&self, _flow_id: Uuid, _limit: usize) -> StoreResult<Vec<ExecutionRecord>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn store_failures_are_counted_and_record_still_returned() {
        let harness = harness_with(flow("unsaved"), EngineSettings::default(), Arc::new(RejectingStore));
        let record = harness
            .engine
            .run(harness.flow.id, CancellationToken::new())
            .await;
        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(harness.engine.metrics().snapshot().store_failures_total, 1);
        assert_eq!(
            harness
                .engine
                .metrics()
                .run_step_count(RunStep::Finalise.as_str(), StepStatus::Failed.as_str()),
            1
        );
    }

    #[tokio::test]
    async fn spawned_runs_publish_lifecycle_events() -> EngineResult<()> {
        let harness = harness(flow("events"));
        harness
            .source
            .push_item(item("m1", "a@x", "s", vec![attachment("a1", "a.txt", 2)]));
        let mut stream = harness.engine.events().subscribe(None);

        let record = harness.engine.spawn(harness.flow.id).join().await?;
        assert_eq!(record.status, RunStatus::Completed);

        let mut kinds = Vec::new();
        while let Some(envelope) = stream.next().await {
            kinds.push(envelope.event.kind());
            if kinds.last() == Some(&"run_completed") {
                break;
            }
        }
        assert_eq!(kinds, vec!["run_started", "payload_transferred", "run_completed"]);
        Ok(())
    }

    #[test]
    fn panic_message_extracts_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(boxed.as_ref()), "static message");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(boxed.as_ref()), "owned message");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
