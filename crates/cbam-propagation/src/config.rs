//! Configuration for the emission propagation engine

use crate::domain::value_objects::Emission;
use serde::{Deserialize, Serialize};

/// Propagation configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// Allowed drift between `attrdir_em` and `matdir + fueldir`
    pub attribution_tolerance: Emission,
    /// Longest path the chain detector will emit (processes per chain)
    pub max_chain_length: usize,
    /// Maximum processes in one graph-mode traversal (anti-DoS)
    pub max_graph_nodes: usize,
    /// Maximum `continue` edges in one graph-mode traversal (anti-DoS)
    pub max_edge_count: usize,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            attribution_tolerance: Emission::from_micros(1),
            max_chain_length: 10,
            max_graph_nodes: 10_000,
            max_edge_count: 50_000,
        }
    }
}
