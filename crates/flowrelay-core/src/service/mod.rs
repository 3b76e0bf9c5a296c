//! Connector traits implemented by source and destination adapters.

use std::sync::Arc;

use async_trait::async_trait;
use flowrelay_config::FlowConfig;

use crate::error::ConnectorResult;
use crate::model::{CandidateItem, DestinationContainer, SourceQuery, UploadRequest, UploadedFile};

/// Read side of a flow: lists items and serves attachment payloads.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Service name used in run-level error messages.
    fn service_name(&self) -> &str;

    /// Lightweight reachability probe; never mutates state.
    async fn test_connection(&self) -> bool;

    /// List the items known at call time that may match `query`.
    async fn list(&self, query: &SourceQuery) -> ConnectorResult<Vec<CandidateItem>>;

    /// Retrieve the bytes of one attachment.
    async fn fetch_payload(&self, item_id: &str, attachment_id: &str) -> ConnectorResult<Vec<u8>>;
}

/// Write side of a flow: resolves containers and stores payloads.
#[async_trait]
pub trait DestinationConnector: Send + Sync {
    /// Service name used in run-level error messages.
    fn service_name(&self) -> &str;

    /// Lightweight reachability probe; never mutates state.
    async fn test_connection(&self) -> bool;

    /// Find an existing container by its full path.
    async fn lookup_container(&self, path: &str) -> ConnectorResult<Option<DestinationContainer>>;

    /// Create a container; returns the existing one when the path is taken.
    async fn create_container(
        &self,
        path: &str,
        parent_id: Option<&str>,
    ) -> ConnectorResult<DestinationContainer>;

    /// Store a payload atomically, applying the request's duplicate policy.
    async fn upload(&self, request: UploadRequest) -> ConnectorResult<UploadedFile>;
}

/// Authenticated connector pair for one run.
#[derive(Clone)]
pub struct ConnectorSet {
    /// Source connector.
    pub source: Arc<dyn SourceConnector>,
    /// Destination connector.
    pub destination: Arc<dyn DestinationConnector>,
}

impl ConnectorSet {
    /// Bundle a source and destination.
    #[must_use]
    pub fn new(source: Arc<dyn SourceConnector>, destination: Arc<dyn DestinationConnector>) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// Hands out already-authenticated connectors for a flow.
#[async_trait]
pub trait ConnectorProvider: Send + Sync {
    /// Build or look up the connectors used by `flow`.
    async fn connectors(&self, flow: &FlowConfig) -> ConnectorResult<ConnectorSet>;
}

/// Provider returning the same connector pair for every flow.
#[derive(Clone)]
pub struct StaticConnectors {
    set: ConnectorSet,
}

impl StaticConnectors {
    /// Wrap a fixed connector pair.
    #[must_use]
    pub const fn new(set: ConnectorSet) -> Self {
        Self { set }
    }
}

#[async_trait]
impl ConnectorProvider for StaticConnectors {
    async fn connectors(&self, _flow: &FlowConfig) -> ConnectorResult<ConnectorSet> {
        Ok(self.set.clone())
    }
}
