//! Outbound Ports (Driven Ports / SPI)
//!
//! Persistence and clock interfaces the engine requires. The in-memory
//! reference adapter lives in `crate::adapters`.

use crate::domain::entities::{
    AttributionUpdate, Edge, EmissionRecord, FuelInput, MaterialInput, NewChain, Process,
    ProcessChain, Product,
};
use crate::domain::errors::StoreError;
use crate::domain::value_objects::{ChainId, EdgeKind, Emission, ProcessId, ProductId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Per-process emission records
#[async_trait]
pub trait EmissionStore: Send + Sync {
    /// Record for a process, `None` when attribution never ran.
    async fn get(&self, process_id: ProcessId) -> Result<Option<EmissionRecord>, StoreError>;

    /// Insert or replace the direct emission figures of a process.
    ///
    /// Single atomic write. Clears the cumulative value, bumps the version and
    /// returns the stored record.
    async fn upsert_attribution(
        &self,
        update: AttributionUpdate,
    ) -> Result<EmissionRecord, StoreError>;

    /// Write the cumulative value if the record is still at
    /// `expected_version`.
    ///
    /// Fails with `StoreError::VersionConflict` when another writer got there
    /// first. Returns the stored record with its new version.
    async fn compare_and_set_cumulative(
        &self,
        process_id: ProcessId,
        expected_version: u64,
        cumulative: Emission,
        at: DateTime<Utc>,
    ) -> Result<EmissionRecord, StoreError>;
}

/// Directed edges between processes and products
#[async_trait]
pub trait EdgeGraph: Send + Sync {
    /// Outgoing `continue` edges of a process, in storage order.
    async fn query_continue_edges(&self, source: ProcessId) -> Result<Vec<Edge>, StoreError>;

    /// Every edge of the given kind, in storage order.
    async fn query_edges_by_kind(&self, kind: EdgeKind) -> Result<Vec<Edge>, StoreError>;
}

/// Process chains and their links
#[async_trait]
pub trait ChainStore: Send + Sync {
    async fn get_chain(&self, chain_id: ChainId) -> Result<Option<ProcessChain>, StoreError>;

    /// Save a new active chain and return it with its assigned id.
    async fn save_chain(&self, chain: NewChain) -> Result<ProcessChain, StoreError>;

    /// Mark every active chain inactive. Returns how many changed.
    async fn deactivate_all_chains(&self) -> Result<usize, StoreError>;
}

/// Process and product catalog
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_process(&self, process_id: ProcessId) -> Result<Option<Process>, StoreError>;

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Processes joined to a product, ordered by process id.
    async fn processes_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Process>, StoreError>;
}

/// Material and fuel consumption records
#[async_trait]
pub trait InputLedger: Send + Sync {
    async fn material_inputs(&self, process_id: ProcessId)
        -> Result<Vec<MaterialInput>, StoreError>;

    async fn fuel_inputs(&self, process_id: ProcessId) -> Result<Vec<FuelInput>, StoreError>;
}

/// Clock used to stamp calculation dates
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource(pub DateTime<Utc>);

impl TimeSource for FixedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
