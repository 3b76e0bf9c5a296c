//! Shared wiring for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use flowrelay_config::{EngineSettings, FlowConfig, MemoryFlowCatalog};
use flowrelay_core::{ConnectorSet, ExecutionRecord, StaticConnectors};
use flowrelay_engine::{EngineDeps, FlowEngine};
use flowrelay_events::EventBus;
use flowrelay_store::MemoryExecutionStore;
use flowrelay_telemetry::Metrics;
use flowrelay_test_support::mocks::{MemoryDestination, MemorySource};
use tokio_util::sync::CancellationToken;

pub struct TestEngine {
    pub engine: FlowEngine,
    pub flow: FlowConfig,
    pub source: Arc<MemorySource>,
    pub destination: Arc<MemoryDestination>,
    pub store: Arc<MemoryExecutionStore>,
}

impl TestEngine {
    pub fn new(flow: FlowConfig) -> Self {
        Self::with_settings(flow, EngineSettings::default())
    }

    pub fn with_settings(flow: FlowConfig, settings: EngineSettings) -> Self {
        let source = Arc::new(MemorySource::new("mail"));
        let destination = Arc::new(MemoryDestination::new("drive"));
        let store = Arc::new(MemoryExecutionStore::new());
        let catalog = MemoryFlowCatalog::new([flow.clone()]).expect("valid flow");
        let engine = FlowEngine::new(EngineDeps {
            catalog: Arc::new(catalog),
            connectors: Arc::new(StaticConnectors::new(ConnectorSet::new(
                source.clone(),
                destination.clone(),
            ))),
            store: store.clone(),
            events: EventBus::new(),
            metrics: Metrics::new().expect("metrics registry"),
            settings,
        });
        Self {
            engine,
            flow,
            source,
            destination,
            store,
        }
    }

    pub async fn run(&self) -> ExecutionRecord {
        self.engine.run(self.flow.id, CancellationToken::new()).await
    }

    pub fn destination_path(&self) -> String {
        format!("Inbox/{}", self.flow.name)
    }
}

pub fn logged(record: &ExecutionRecord, needle: &str) -> bool {
    record
        .logs
        .iter()
        .any(|entry| entry.message.contains(needle))
}
