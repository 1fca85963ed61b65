//! Kahn's Topological Traversal
//!
//! O((V + E) log V). The ready set is a min-heap of arena indices, so among
//! nodes whose predecessors are all visited the lowest index (earliest
//! discovered) goes first. For a chain graph this is exactly sequence order.

use crate::domain::entities::{PropagationGraph, TraversalPlan};
use crate::domain::errors::Fault;
use crate::domain::value_objects::ProcessId;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Compute the visit order and topological levels of `graph`.
///
/// Fails with `Fault::Cycle` listing the processes that could never become
/// ready, sorted by id.
pub fn kahns_topological_order(graph: &PropagationGraph) -> Result<TraversalPlan, Fault> {
    let node_count = graph.node_count();
    if node_count == 0 {
        return Ok(TraversalPlan::default());
    }

    // 1. Working copy of in-degrees
    let mut in_degree = graph.in_degree.clone();

    // 2. Seed with zero in-degree nodes
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(idx, _)| Reverse(idx))
        .collect();

    // 3. Pop lowest index, release successors
    let mut order = Vec::with_capacity(node_count);
    let mut level = vec![0usize; node_count];

    while let Some(Reverse(idx)) = ready.pop() {
        level[idx] = graph.predecessors[idx]
            .iter()
            .map(|&pred| level[pred] + 1)
            .max()
            .unwrap_or(0);
        order.push(idx);

        for &next in &graph.adjacency[idx] {
            let degree = &mut in_degree[next];
            *degree = degree.saturating_sub(1);
            if *degree == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    // 4. Anything left unvisited sits on or behind a cycle
    if order.len() < node_count {
        let mut unresolved: Vec<ProcessId> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree > 0)
            .map(|(idx, _)| graph.nodes[idx])
            .collect();
        unresolved.sort();
        return Err(Fault::Cycle(unresolved));
    }

    let depth = level.iter().copied().max().map_or(0, |max| max + 1);
    let mut levels: Vec<Vec<usize>> = vec![Vec::new(); depth];
    for &idx in &order {
        levels[level[idx]].push(idx);
    }
    for group in &mut levels {
        group.sort_unstable();
    }

    Ok(TraversalPlan { order, levels })
}
