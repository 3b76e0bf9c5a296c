//! Environment loading and service wiring.

use std::path::PathBuf;
use std::sync::Arc;

use flowrelay_config::{EngineSettings, FileFlowCatalog, FlowCatalog};
use flowrelay_connectors::{LocalDestination, SpoolSource};
use flowrelay_core::{ConnectorSet, StaticConnectors};
use flowrelay_engine::{EngineDeps, FlowEngine, FlowScheduler};
use flowrelay_events::EventBus;
use flowrelay_store::{ExecutionStore, MemoryExecutionStore, PgExecutionStore};
use flowrelay_telemetry::Metrics;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// Path to the JSON flow definitions.
pub const ENV_FLOWS_FILE: &str = "FLOWRELAY_FLOWS_FILE";
/// Spool directory read by the source connector.
pub const ENV_SPOOL_DIR: &str = "FLOWRELAY_SPOOL_DIR";
/// Storage root written by the destination connector.
pub const ENV_STORAGE_ROOT: &str = "FLOWRELAY_STORAGE_ROOT";
/// Optional PostgreSQL connection string for run history.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Process configuration read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppEnv {
    /// JSON flow definitions.
    pub flows_file: PathBuf,
    /// Spool directory for [`SpoolSource`].
    pub spool_dir: PathBuf,
    /// Storage root for [`LocalDestination`].
    pub storage_root: PathBuf,
    /// PostgreSQL URL; the in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Engine limits.
    pub settings: EngineSettings,
}

impl AppEnv {
    /// Read the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or a setting is invalid.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or a setting is invalid.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| {
            non_empty(name)
                .map(PathBuf::from)
                .ok_or(AppError::MissingEnv { name })
        };
        let settings = EngineSettings::from_lookup(&lookup)
            .map_err(|err| AppError::config("engine_settings.load", err))?;
        Ok(Self {
            flows_file: required(ENV_FLOWS_FILE)?,
            spool_dir: required(ENV_SPOOL_DIR)?,
            storage_root: required(ENV_STORAGE_ROOT)?,
            database_url: non_empty(ENV_DATABASE_URL),
            settings,
        })
    }
}

/// Wired services shared by every command.
pub struct Services {
    /// Flow definitions.
    pub catalog: Arc<dyn FlowCatalog>,
    /// Run history.
    pub store: Arc<dyn ExecutionStore>,
    /// Execution engine.
    pub engine: FlowEngine,
}

impl Services {
    /// Scheduler over the catalog using the configured poll interval.
    #[must_use]
    pub fn scheduler(&self) -> FlowScheduler {
        FlowScheduler::new(
            self.engine.clone(),
            self.catalog.clone(),
            self.engine.settings().poll_interval,
        )
    }
}

/// Load the catalog, open the store, and build the engine.
///
/// # Errors
///
/// Returns an error if the flow file is invalid, the database is unreachable,
/// or metrics cannot be registered.
pub async fn build_services(env: &AppEnv) -> AppResult<Services> {
    let catalog: Arc<dyn FlowCatalog> = Arc::new(
        FileFlowCatalog::load(&env.flows_file)
            .await
            .map_err(|err| AppError::config("flow_catalog.load", err))?,
    );

    let store: Arc<dyn ExecutionStore> = if let Some(url) = &env.database_url {
        let store = PgExecutionStore::connect(url)
            .await
            .map_err(|err| AppError::store("execution_store.connect", err))?;
        info!("execution history stored in postgres");
        Arc::new(store)
    } else {
        warn!("DATABASE_URL not set; execution history is kept in memory only");
        Arc::new(MemoryExecutionStore::new())
    };

    let connectors = ConnectorSet::new(
        Arc::new(SpoolSource::new(&env.spool_dir)),
        Arc::new(LocalDestination::new(&env.storage_root)),
    );
    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;

    let engine = FlowEngine::new(EngineDeps {
        catalog: catalog.clone(),
        connectors: Arc::new(StaticConnectors::new(connectors)),
        store: store.clone(),
        events: EventBus::new(),
        metrics,
        settings: env.settings,
    });

    Ok(Services {
        catalog,
        store,
        engine,
    })
}
