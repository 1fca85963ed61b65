//! Inbound Ports (Driving Ports / API)

use crate::domain::entities::{
    ChainPropagationResult, ChainRegistration, ChainSummary, DetectedChain, Edge,
    EmissionRecord, GraphPropagationResult, ProductEmissionTotal,
};
use crate::domain::errors::EmissionError;
use crate::domain::value_objects::{ChainId, GraphScope, ProcessId, ProductId};
use async_trait::async_trait;

/// Primary emission accounting API
#[async_trait]
pub trait EmissionAccountingApi: Send + Sync {
    /// Compute and store a process's direct attributable emission from its
    /// material and fuel inputs. Clears any cumulative value.
    async fn calculate_attribution(
        &self,
        process_id: ProcessId,
    ) -> Result<EmissionRecord, EmissionError>;

    /// `target.cumulative = source.cumulative + target.attrdir_em`
    async fn propagate_point(
        &self,
        source_id: ProcessId,
        target_id: ProcessId,
    ) -> Result<bool, EmissionError>;

    /// Propagate along a stored chain, strictly in sequence order.
    async fn propagate_chain(
        &self,
        chain_id: ChainId,
    ) -> Result<ChainPropagationResult, EmissionError>;

    /// Propagate over the `continue` graph in topological order.
    ///
    /// Cycles are rejected before any write.
    async fn propagate_graph(
        &self,
        scope: GraphScope,
    ) -> Result<GraphPropagationResult, EmissionError>;

    /// Outgoing `continue` edges of a process.
    async fn get_continue_edges(&self, process_id: ProcessId) -> Result<Vec<Edge>, EmissionError>;

    async fn summarize_chain(&self, chain_id: ChainId) -> Result<ChainSummary, EmissionError>;

    async fn aggregate_product(
        &self,
        product_id: ProductId,
    ) -> Result<ProductEmissionTotal, EmissionError>;

    /// Find linear `continue` paths. `None` uses the configured limit.
    async fn detect_chains(
        &self,
        max_chain_length: Option<usize>,
    ) -> Result<Vec<DetectedChain>, EmissionError>;

    /// Replace all active chains with freshly detected ones.
    async fn register_detected_chains(
        &self,
        max_chain_length: Option<usize>,
    ) -> Result<ChainRegistration, EmissionError>;
}
