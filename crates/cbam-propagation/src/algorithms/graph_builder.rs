//! Propagation graph builder
//!
//! Turns chain links or `continue` edges into the arena graph consumed by
//! the traversal core.

use crate::domain::entities::{ChainLink, Edge, PropagationGraph};
use crate::domain::errors::{Fault, ValidationReason};

/// Build the graph of a chain. Links must be sorted by sequence order.
///
/// Members become nodes in sequence order, so arena index == position. An
/// edge joins consecutive members when the later one is flagged
/// `is_continue_edge`; the first member's flag is ignored.
pub fn build_chain_graph(links: &[ChainLink]) -> PropagationGraph {
    let mut graph = PropagationGraph::new();
    let mut previous = None;

    for link in links {
        graph.add_node(link.process_id);
        if let (Some(prev), true) = (previous, link.is_continue_edge) {
            graph.add_edge(prev, link.process_id);
        }
        previous = Some(link.process_id);
    }

    graph
}

/// Validate a `continue` edge and add it. Returns false for a duplicate.
pub fn add_continue_edge(graph: &mut PropagationGraph, edge: &Edge) -> Result<bool, Fault> {
    let (from, to) = edge.continue_endpoints()?;
    Ok(graph.add_edge(from, to))
}

/// Reject graphs over the configured size limits.
pub fn check_limits(
    graph: &PropagationGraph,
    max_nodes: usize,
    max_edges: usize,
) -> Result<(), Fault> {
    if graph.node_count() > max_nodes {
        return Err(ValidationReason::TooManyNodes {
            count: graph.node_count(),
            max: max_nodes,
        }
        .into());
    }
    if graph.edge_count > max_edges {
        return Err(ValidationReason::TooManyEdges {
            count: graph.edge_count,
            max: max_edges,
        }
        .into());
    }
    Ok(())
}

/// Build the graph of a set of `continue` edges, nodes in discovery order.
pub fn build_edge_graph(
    edges: &[Edge],
    max_nodes: usize,
    max_edges: usize,
) -> Result<PropagationGraph, Fault> {
    if edges.len() > max_edges {
        return Err(ValidationReason::TooManyEdges {
            count: edges.len(),
            max: max_edges,
        }
        .into());
    }

    let mut graph = PropagationGraph::new();
    for edge in edges {
        add_continue_edge(&mut graph, edge)?;
    }
    check_limits(&graph, max_nodes, max_edges)?;

    Ok(graph)
}
