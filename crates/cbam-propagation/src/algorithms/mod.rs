//! Algorithms module for emission propagation
//!
//! Contains:
//! - Propagation graph builder
//! - Kahn's topological traversal
//! - Linear chain detector

pub mod chain_detector;
pub mod graph_builder;
pub mod kahns;

pub use chain_detector::detect_linear_chains;
pub use graph_builder::{add_continue_edge, build_chain_graph, build_edge_graph, check_limits};
pub use kahns::kahns_topological_order;
