//! # Emission Accounting Service
//!
//! The main service implementing `EmissionAccountingApi`.
//!
//! ## Architecture
//!
//! This service:
//! 1. Computes direct attribution from the input ledger
//! 2. Propagates cumulative emissions through one traversal core
//!    (chain mode and graph mode)
//! 3. Produces chain summaries and product totals
//! 4. Detects and registers linear chains
//!
//! Every write goes through the store's compare-and-set. Steps are strictly
//! sequential and nothing is rolled back on failure.

mod attribution;
mod detection;
mod propagation;
mod reporting;

use crate::config::PropagationConfig;
use crate::domain::entities::{
    ChainPropagationResult, ChainRegistration, ChainSummary, DetectedChain, Edge,
    EmissionRecord, GraphPropagationResult, ProductEmissionTotal,
};
use crate::domain::errors::{EmissionError, EntityKind, Fault, Operation};
use crate::domain::value_objects::{ChainId, GraphScope, ProcessId, ProductId};
use crate::ports::inbound::EmissionAccountingApi;
use crate::ports::outbound::{
    Catalog, ChainStore, EdgeGraph, EmissionStore, InputLedger, TimeSource,
};
use async_trait::async_trait;

/// The Emission Accounting Service.
pub struct EmissionAccountingService<ES, EG, CS, CT, IL, TS>
where
    ES: EmissionStore,
    EG: EdgeGraph,
    CS: ChainStore,
    CT: Catalog,
    IL: InputLedger,
    TS: TimeSource,
{
    /// Per-process emission records.
    pub(crate) emissions: ES,
    /// `continue`/`produce`/`consume` edges.
    pub(crate) edges: EG,
    /// Chains and links.
    pub(crate) chains: CS,
    /// Process and product catalog.
    pub(crate) catalog: CT,
    /// Material and fuel inputs.
    pub(crate) inputs: IL,
    /// Clock for calculation dates.
    pub(crate) time_source: TS,
    pub(crate) config: PropagationConfig,
}

/// Dependencies for EmissionAccountingService
pub struct EmissionAccountingDependencies<ES, EG, CS, CT, IL, TS> {
    pub emissions: ES,
    pub edges: EG,
    pub chains: CS,
    pub catalog: CT,
    pub inputs: IL,
    pub time_source: TS,
}

impl<ES, EG, CS, CT, IL, TS> EmissionAccountingService<ES, EG, CS, CT, IL, TS>
where
    ES: EmissionStore,
    EG: EdgeGraph,
    CS: ChainStore,
    CT: Catalog,
    IL: InputLedger,
    TS: TimeSource,
{
    pub fn new(
        deps: EmissionAccountingDependencies<ES, EG, CS, CT, IL, TS>,
        config: PropagationConfig,
    ) -> Self {
        Self {
            emissions: deps.emissions,
            edges: deps.edges,
            chains: deps.chains,
            catalog: deps.catalog,
            inputs: deps.inputs,
            time_source: deps.time_source,
            config,
        }
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Load an emission record or fail with `NotFound(emission record)`.
    pub(crate) async fn load_record(&self, process_id: ProcessId) -> Result<EmissionRecord, Fault> {
        self.emissions
            .get(process_id)
            .await
            .map_err(Fault::store("load emission record"))?
            .ok_or_else(|| Fault::not_found(EntityKind::EmissionRecord, process_id))
    }
}

#[async_trait]
impl<ES, EG, CS, CT, IL, TS> EmissionAccountingApi for EmissionAccountingService<ES, EG, CS, CT, IL, TS>
where
    ES: EmissionStore,
    EG: EdgeGraph,
    CS: ChainStore,
    CT: Catalog,
    IL: InputLedger,
    TS: TimeSource,
{
    async fn calculate_attribution(
        &self,
        process_id: ProcessId,
    ) -> Result<EmissionRecord, EmissionError> {
        self.attribute(process_id)
            .await
            .map_err(|fault| fault.during(Operation::CalculateAttribution))
    }

    async fn propagate_point(
        &self,
        source_id: ProcessId,
        target_id: ProcessId,
    ) -> Result<bool, EmissionError> {
        self.point_to_point(source_id, target_id)
            .await
            .map_err(|fault| fault.during(Operation::PropagatePoint))
    }

    async fn propagate_chain(
        &self,
        chain_id: ChainId,
    ) -> Result<ChainPropagationResult, EmissionError> {
        self.chain_propagation(chain_id)
            .await
            .map_err(|fault| fault.during(Operation::PropagateChain))
    }

    async fn propagate_graph(
        &self,
        scope: GraphScope,
    ) -> Result<GraphPropagationResult, EmissionError> {
        self.graph_propagation(scope)
            .await
            .map_err(|fault| fault.during(Operation::PropagateGraph))
    }

    async fn get_continue_edges(&self, process_id: ProcessId) -> Result<Vec<Edge>, EmissionError> {
        self.continue_edges(process_id)
            .await
            .map_err(|fault| fault.during(Operation::GetContinueEdges))
    }

    async fn summarize_chain(&self, chain_id: ChainId) -> Result<ChainSummary, EmissionError> {
        self.chain_summary(chain_id)
            .await
            .map_err(|fault| fault.during(Operation::SummarizeChain))
    }

    async fn aggregate_product(
        &self,
        product_id: ProductId,
    ) -> Result<ProductEmissionTotal, EmissionError> {
        self.product_total(product_id)
            .await
            .map_err(|fault| fault.during(Operation::AggregateProduct))
    }

    async fn detect_chains(
        &self,
        max_chain_length: Option<usize>,
    ) -> Result<Vec<DetectedChain>, EmissionError> {
        self.detect(max_chain_length)
            .await
            .map_err(|fault| fault.during(Operation::DetectChains))
    }

    async fn register_detected_chains(
        &self,
        max_chain_length: Option<usize>,
    ) -> Result<ChainRegistration, EmissionError> {
        self.register(max_chain_length)
            .await
            .map_err(|fault| fault.during(Operation::RegisterDetectedChains))
    }
}
