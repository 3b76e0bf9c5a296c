//! Periodic trigger loop that starts runs for every enabled flow.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use flowrelay_config::FlowCatalog;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::{FlowEngine, RunHandle};

/// Polls the catalog and keeps at most one run per flow in flight.
pub struct FlowScheduler {
    engine: FlowEngine,
    catalog: Arc<dyn FlowCatalog>,
    poll_interval: Duration,
    in_flight: HashMap<Uuid, RunHandle>,
}

impl FlowScheduler {
    /// Build a scheduler; a zero interval is raised to one millisecond.
    #[must_use]
    pub fn new(engine: FlowEngine, catalog: Arc<dyn FlowCatalog>, poll_interval: Duration) -> Self {
        Self {
            engine,
            catalog,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            in_flight: HashMap::new(),
        }
    }

    /// Flows with a run currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> Vec<Uuid> {
        let mut ids: Vec<_> = self.in_flight.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Run one scheduling pass: reap finished runs, then start a run for
    /// each enabled flow that has none in flight.
    pub async fn tick(&mut self, shutdown: &CancellationToken) {
        self.reap().await;

        let flows = match self.catalog.list_flows().await {
            Ok(flows) => flows,
            Err(err) => {
                warn!(error = %err, "failed to list flows; skipping tick");
                return;
            }
        };

        for flow in flows.into_iter().filter(|flow| flow.enabled) {
            if self.in_flight.contains_key(&flow.id) {
                debug!(flow_id = %flow.id, "previous run still in flight; skipping");
                continue;
            }
            debug!(flow_id = %flow.id, flow = %flow.name, "starting scheduled run");
            let handle = self
                .engine
                .spawn_with_token(flow.id, shutdown.child_token());
            self.in_flight.insert(flow.id, handle);
        }
    }

    /// Tick every poll interval until `shutdown` is cancelled, then cancel
    /// and await in-flight runs.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(interval_ms = self.poll_interval.as_millis(), "flow scheduler started");
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = interval.tick() => self.tick(&shutdown).await,
            }
        }

        self.drain().await;
        info!("flow scheduler stopped");
    }

    async fn reap(&mut self) {
        let finished: Vec<Uuid> = self
            .in_flight
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(flow_id, _)| *flow_id)
            .collect();
        for flow_id in finished {
            if let Some(handle) = self.in_flight.remove(&flow_id) {
                await_run(handle).await;
            }
        }
    }

    async fn drain(&mut self) {
        for handle in self.in_flight.values() {
            handle.cancel();
        }
        for (_, handle) in self.in_flight.drain() {
            await_run(handle).await;
        }
    }
}

async fn await_run(handle: RunHandle) {
    match handle.join().await {
        Ok(record) => debug!(
            flow_id = %record.flow_id,
            record_id = %record.id,
            status = record.status.as_str(),
            "scheduled run finished"
        ),
        Err(err) => warn!(error = %err, "scheduled run task failed"),
    }
}
