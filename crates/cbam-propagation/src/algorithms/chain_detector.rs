//! Linear chain detection over the `continue` graph
//!
//! Walks every head (no incoming `continue` edge) depth-first, never
//! revisiting a process already on the current path, and emits a path when it
//! cannot be extended or has reached the length limit.

use crate::domain::entities::{DetectedChain, PropagationGraph};
use crate::domain::errors::{Fault, ValidationReason};

/// Shortest path that counts as a chain.
pub const MIN_CHAIN_LENGTH: usize = 2;

/// Detect linear paths of at most `max_len` processes.
pub fn detect_linear_chains(
    graph: &PropagationGraph,
    max_len: usize,
) -> Result<Vec<DetectedChain>, Fault> {
    if max_len < MIN_CHAIN_LENGTH {
        return Err(ValidationReason::ChainLengthTooShort {
            requested: max_len,
            min: MIN_CHAIN_LENGTH,
        }
        .into());
    }
    if graph.is_empty() {
        return Ok(Vec::new());
    }

    let heads: Vec<usize> = (0..graph.node_count())
        .filter(|&idx| graph.in_degree[idx] == 0)
        .collect();
    if heads.is_empty() {
        let mut processes = graph.nodes.clone();
        processes.sort();
        return Err(Fault::Cycle(processes));
    }

    let mut chains = Vec::new();
    let mut on_path = vec![false; graph.node_count()];
    let mut path = Vec::with_capacity(max_len);

    for head in heads {
        walk(graph, head, max_len, &mut path, &mut on_path, &mut chains);
    }

    Ok(chains)
}

fn walk(
    graph: &PropagationGraph,
    node: usize,
    max_len: usize,
    path: &mut Vec<usize>,
    on_path: &mut [bool],
    chains: &mut Vec<DetectedChain>,
) {
    path.push(node);
    on_path[node] = true;

    let mut extended = false;
    if path.len() < max_len {
        for &next in &graph.adjacency[node] {
            if on_path[next] {
                continue;
            }
            extended = true;
            walk(graph, next, max_len, path, on_path, chains);
        }
    }

    if !extended && path.len() >= MIN_CHAIN_LENGTH {
        chains.push(DetectedChain {
            processes: path.iter().map(|&idx| graph.nodes[idx]).collect(),
        });
    }

    on_path[node] = false;
    path.pop();
}
