//! Domain invariants for emission propagation

use super::entities::{ChainLink, EmissionRecord, PropagationGraph, TraversalPlan};
use super::errors::ValidationReason;
use super::value_objects::{Emission, ProcessId};
use std::collections::HashSet;

/// Attribution: `attrdir_em == matdir + fueldir` within `tolerance`.
pub fn invariant_attribution(
    record: &EmissionRecord,
    tolerance: Emission,
) -> Result<(), ValidationReason> {
    let expected = record
        .total_matdir_emission
        .checked_add(record.total_fueldir_emission)
        .ok_or(ValidationReason::EmissionOverflow(record.process_id))?;
    if record.attrdir_em.abs_diff(expected) > tolerance {
        return Err(ValidationReason::AttributionMismatch {
            process_id: record.process_id,
            attrdir: record.attrdir_em,
            expected,
        });
    }
    Ok(())
}

/// Total of per-process amounts. Overflow names the process whose amount
/// pushed the running total out of range.
pub fn checked_total<I>(amounts: I) -> Result<Emission, ValidationReason>
where
    I: IntoIterator<Item = (ProcessId, Emission)>,
{
    amounts
        .into_iter()
        .try_fold(Emission::ZERO, |total, (process_id, amount)| {
            total
                .checked_add(amount)
                .ok_or(ValidationReason::EmissionOverflow(process_id))
        })
}

/// Cumulative never drops below the direct emission.
pub fn invariant_cumulative_covers_direct(
    record: &EmissionRecord,
    cumulative: Emission,
) -> Result<(), ValidationReason> {
    if cumulative < record.attrdir_em {
        return Err(ValidationReason::CumulativeBelowDirect {
            process_id: record.process_id,
            cumulative,
            attrdir: record.attrdir_em,
        });
    }
    Ok(())
}

/// Chain links: positive, strictly increasing sequence orders, no repeated
/// process. Links must already be sorted by sequence order.
pub fn validate_chain_links(links: &[ChainLink]) -> Result<(), ValidationReason> {
    let mut seen = HashSet::with_capacity(links.len());
    let mut previous: Option<i64> = None;

    for link in links {
        if link.sequence_order <= 0 {
            return Err(ValidationReason::NonPositiveSequence {
                process_id: link.process_id,
                sequence_order: link.sequence_order,
            });
        }
        if let Some(prev) = previous {
            if link.sequence_order <= prev {
                return Err(ValidationReason::NonIncreasingSequence {
                    process_id: link.process_id,
                    previous: prev,
                    current: link.sequence_order,
                });
            }
        }
        if !seen.insert(link.process_id) {
            return Err(ValidationReason::DuplicateChainMember(link.process_id));
        }
        previous = Some(link.sequence_order);
    }

    Ok(())
}

/// Every edge `a -> b` has `a` visited before `b`.
pub fn invariant_topological_order(plan: &TraversalPlan, graph: &PropagationGraph) -> bool {
    let mut position = vec![usize::MAX; graph.node_count()];
    for (pos, &idx) in plan.order.iter().enumerate() {
        if let Some(slot) = position.get_mut(idx) {
            *slot = pos;
        }
    }

    graph.adjacency.iter().enumerate().all(|(from, successors)| {
        successors
            .iter()
            .all(|&to| position[to] != usize::MAX && position[from] < position[to])
    })
}

/// Every node is visited exactly once.
pub fn invariant_completeness(plan: &TraversalPlan, graph: &PropagationGraph) -> bool {
    if plan.order.len() != graph.node_count() {
        return false;
    }
    let unique: HashSet<usize> = plan.order.iter().copied().collect();
    unique.len() == graph.node_count() && unique.iter().all(|&idx| idx < graph.node_count())
}

/// The graph is a DAG.
pub fn invariant_no_cycles(graph: &PropagationGraph) -> bool {
    let mut visited = vec![false; graph.node_count()];
    let mut on_stack = vec![false; graph.node_count()];

    (0..graph.node_count()).all(|idx| !has_cycle_dfs(graph, idx, &mut visited, &mut on_stack))
}

fn has_cycle_dfs(
    graph: &PropagationGraph,
    node: usize,
    visited: &mut [bool],
    on_stack: &mut [bool],
) -> bool {
    if on_stack[node] {
        return true;
    }
    if visited[node] {
        return false;
    }

    visited[node] = true;
    on_stack[node] = true;

    for &next in &graph.adjacency[node] {
        if has_cycle_dfs(graph, next, visited, on_stack) {
            return true;
        }
    }

    on_stack[node] = false;
    false
}
