//! Read-only flow lookup consumed by the execution engine.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::{ConfigError, ConfigResult};
use crate::model::FlowConfig;
use crate::validate::validate_flow;

/// Source of flow definitions.
#[async_trait]
pub trait FlowCatalog: Send + Sync {
    /// Fetch a single flow by identifier.
    ///
    /// Implementations return [`ConfigError::FlowNotFound`] for unknown identifiers.
    async fn get_flow(&self, flow_id: Uuid) -> ConfigResult<FlowConfig>;

    /// List every known flow, ordered by name and then identifier.
    async fn list_flows(&self) -> ConfigResult<Vec<FlowConfig>>;
}

/// In-memory flow catalog.
#[derive(Default)]
pub struct MemoryFlowCatalog {
    flows: RwLock<HashMap<Uuid, FlowConfig>>,
}

impl MemoryFlowCatalog {
    /// Build a catalog from a set of flows, validating each one.
    ///
    /// # Errors
    ///
    /// Returns an error if a flow fails validation or an identifier repeats.
    pub fn new(flows: impl IntoIterator<Item = FlowConfig>) -> ConfigResult<Self> {
        Ok(Self {
            flows: RwLock::new(index_flows(flows)?),
        })
    }

    /// Register or replace a flow definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the flow fails validation.
    pub async fn upsert(&self, flow: FlowConfig) -> ConfigResult<()> {
        let flow = validate_flow(flow)?;
        self.flows.write().await.insert(flow.id, flow);
        Ok(())
    }
}

#[async_trait]
impl FlowCatalog for MemoryFlowCatalog {
    async fn get_flow(&self, flow_id: Uuid) -> ConfigResult<FlowConfig> {
        self.flows
            .read()
            .await
            .get(&flow_id)
            .cloned()
            .ok_or(ConfigError::FlowNotFound { flow_id })
    }

    async fn list_flows(&self) -> ConfigResult<Vec<FlowConfig>> {
        let flows = self.flows.read().await;
        Ok(sorted(flows.values().cloned().collect()))
    }
}

/// Flow catalog loaded once from a JSON array on disk.
pub struct FileFlowCatalog {
    path: PathBuf,
    flows: HashMap<Uuid, FlowConfig>,
}

impl FileFlowCatalog {
    /// Load and validate every flow in the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded, a flow fails
    /// validation, or an identifier repeats.
    pub async fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = tokio::fs::read(&path)
            .await
            .map_err(|source| ConfigError::Io {
                operation: "flow_catalog.read",
                path: path.clone(),
                source,
            })?;
        let flows: Vec<FlowConfig> =
            serde_json::from_slice(&raw).map_err(|source| ConfigError::Json {
                operation: "flow_catalog.decode",
                path: path.clone(),
                source,
            })?;
        let flows = index_flows(flows)?;
        info!(path = %path.display(), flows = flows.len(), "flow catalog loaded");
        Ok(Self { path, flows })
    }

    /// Path the catalog was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FlowCatalog for FileFlowCatalog {
    async fn get_flow(&self, flow_id: Uuid) -> ConfigResult<FlowConfig> {
        self.flows
            .get(&flow_id)
            .cloned()
            .ok_or(ConfigError::FlowNotFound { flow_id })
    }

    async fn list_flows(&self) -> ConfigResult<Vec<FlowConfig>> {
        Ok(sorted(self.flows.values().cloned().collect()))
    }
}

fn index_flows(flows: impl IntoIterator<Item = FlowConfig>) -> ConfigResult<HashMap<Uuid, FlowConfig>> {
    let mut indexed = HashMap::new();
    for flow in flows {
        let flow = validate_flow(flow)?;
        let flow_id = flow.id;
        if indexed.insert(flow_id, flow).is_some() {
            return Err(ConfigError::DuplicateFlow { flow_id });
        }
    }
    Ok(indexed)
}

fn sorted(mut flows: Vec<FlowConfig>) -> Vec<FlowConfig> {
    flows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    flows
}
