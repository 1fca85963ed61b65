//! # Chain Detection
//!
//! Finds linear `continue` paths and registers them as chains.

use super::*;
use crate::algorithms::{build_edge_graph, detect_linear_chains};
use crate::domain::entities::RegisteredChain;
use crate::domain::value_objects::EdgeKind;
use tracing::info;

impl<ES, EG, CS, CT, IL, TS> EmissionAccountingService<ES, EG, CS, CT, IL, TS>
where
    ES: EmissionStore,
    EG: EdgeGraph,
    CS: ChainStore,
    CT: Catalog,
    IL: InputLedger,
    TS: TimeSource,
{
    pub(crate) async fn detect(
        &self,
        max_chain_length: Option<usize>,
    ) -> Result<Vec<DetectedChain>, Fault> {
        let limit = max_chain_length.unwrap_or(self.config.max_chain_length);

        let edges = self
            .edges
            .query_edges_by_kind(EdgeKind::Continue)
            .await
            .map_err(Fault::store("load continue edges"))?;
        let graph = build_edge_graph(
            &edges,
            self.config.max_graph_nodes,
            self.config.max_edge_count,
        )?;
        let chains = detect_linear_chains(&graph, limit)?;

        info!(
            edges = graph.edge_count,
            max_chain_length = limit,
            detected = chains.len(),
            "Chain detection complete"
        );
        Ok(chains)
    }

    /// Detection runs first, so a failure leaves existing chains active.
    pub(crate) async fn register(
        &self,
        max_chain_length: Option<usize>,
    ) -> Result<ChainRegistration, Fault> {
        let detected = self.detect(max_chain_length).await?;

        let deactivated_chains = self
            .chains
            .deactivate_all_chains()
            .await
            .map_err(Fault::store("deactivate chains"))?;

        let mut chains = Vec::with_capacity(detected.len());
        for path in &detected {
            let saved = self
                .chains
                .save_chain(path.to_new_chain())
                .await
                .map_err(Fault::store("save chain"))?;
            chains.push(RegisteredChain {
                chain_id: saved.id,
                name: saved.name,
                processes: path.processes.clone(),
            });
        }

        info!(
            deactivated = deactivated_chains,
            registered = chains.len(),
            "Detected chains registered"
        );

        Ok(ChainRegistration {
            deactivated_chains,
            chains,
        })
    }
}
