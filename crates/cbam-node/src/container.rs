//! # Service Container
//!
//! Wires the accounting service to the in-memory store and wraps it in the
//! request handler.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use cbam_propagation::{
    Dataset, EmissionAccountingDependencies, EmissionAccountingService, EmissionRequestHandler,
    InMemoryCbamStore, SystemTimeSource,
};
use tracing::{info, warn};

use crate::config::NodeConfig;

/// Service bound to the in-memory store on every port.
pub type NodeService = EmissionAccountingService<
    InMemoryCbamStore,
    InMemoryCbamStore,
    InMemoryCbamStore,
    InMemoryCbamStore,
    InMemoryCbamStore,
    SystemTimeSource,
>;

/// Store, handler and configuration for one run.
pub struct NodeContainer {
    pub store: InMemoryCbamStore,
    pub handler: EmissionRequestHandler<NodeService>,
    pub config: NodeConfig,
}

impl NodeContainer {
    /// Load the configured dataset (if any) and wire the service.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let dataset = match &config.dataset {
            Some(path) => load_dataset(path)?,
            None => {
                warn!("No dataset configured, starting with an empty store");
                Dataset::default()
            }
        };
        Self::from_dataset(dataset, config)
    }

    /// Wire the service over an already loaded dataset.
    pub fn from_dataset(dataset: Dataset, config: NodeConfig) -> Result<Self> {
        info!(
            processes = dataset.processes.len(),
            edges = dataset.edges.len(),
            chains = dataset.chains.len(),
            "Seeding in-memory store"
        );
        let store =
            InMemoryCbamStore::from_dataset(dataset).context("Failed to seed in-memory store")?;

        let deps = EmissionAccountingDependencies {
            emissions: store.clone(),
            edges: store.clone(),
            chains: store.clone(),
            catalog: store.clone(),
            inputs: store.clone(),
            time_source: SystemTimeSource,
        };
        let service = EmissionAccountingService::new(deps, config.propagation.clone());
        let handler = EmissionRequestHandler::new(service, config.propagation.clone());

        Ok(Self {
            store,
            handler,
            config,
        })
    }

    /// Write the store back to the dataset file when persistence is on.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = self.config.dataset.as_ref().filter(|_| self.config.persist) else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.store.snapshot())
            .context("Failed to encode dataset")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write dataset {}", path.display()))?;
        info!(path = %path.display(), "Dataset persisted");
        Ok(())
    }
}

/// Read and decode a dataset file.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse dataset {}", path.display()))
}
