//! # Propagation
//!
//! Point-to-point, chain and graph modes. Chain and graph share
//! `run_traversal`: build an arena graph, order it with Kahn's algorithm,
//! then apply one step per node.

use super::*;
use crate::algorithms::{
    add_continue_edge, build_chain_graph, build_edge_graph, check_limits,
    kahns_topological_order,
};
use crate::domain::entities::{
    EmissionSummary, PropagationGraph, PropagationStep, TraversalPlan,
};
use crate::domain::errors::ValidationReason;
use crate::domain::invariants::{
    invariant_attribution, invariant_cumulative_covers_direct, validate_chain_links,
};
use crate::domain::value_objects::{EdgeKind, Emission, PropagationType};
use std::collections::VecDeque;
use tracing::{debug, info};

/// How step tags are assigned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TraversalMode {
    Chain,
    Graph,
}

/// Graph to traverse, plus the stored `continue` predecessors of each node
/// that lie outside it. Those are read but never written.
pub(crate) struct ScopedGraph {
    pub graph: PropagationGraph,
    /// Out-of-scope predecessors by arena index
    pub upstream: Vec<Vec<ProcessId>>,
}

/// Own and cumulative emission written by one step
#[derive(Clone, Copy, Debug)]
pub(crate) struct StepOutcome {
    pub own: Emission,
    pub cumulative: Emission,
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
    /// `target.cumulative = Σ source.cumulative + target.attrdir_em`
    ///
    /// Sources are read first, then the target; the write is a single
    /// compare-and-set against the target version read here. A source never
    /// propagated contributes its direct emission.
    pub(crate) async fn apply_step(
        &self,
        target: ProcessId,
        sources: &[ProcessId],
    ) -> Result<StepOutcome, Fault> {
        let mut inherited = Emission::ZERO;
        for &source in sources {
            let record = self.load_record(source).await?;
            inherited = inherited
                .checked_add(record.effective_cumulative())
                .ok_or(ValidationReason::EmissionOverflow(target))?;
        }

        let record = self.load_record(target).await?;
        invariant_attribution(&record, self.config.attribution_tolerance)?;

        let cumulative = inherited
            .checked_add(record.attrdir_em)
            .ok_or(ValidationReason::EmissionOverflow(target))?;
        invariant_cumulative_covers_direct(&record, cumulative)?;

        self.emissions
            .compare_and_set_cumulative(target, record.version, cumulative, self.time_source.now())
            .await
            .map_err(Fault::store("write cumulative emission"))?;

        Ok(StepOutcome {
            own: record.attrdir_em,
            cumulative,
        })
    }

    pub(crate) async fn point_to_point(
        &self,
        source: ProcessId,
        target: ProcessId,
    ) -> Result<bool, Fault> {
        if source == target {
            return Err(ValidationReason::SelfPropagation(source).into());
        }

        let outcome = self.apply_step(target, &[source]).await?;

        info!(
            source = %source,
            target = %target,
            cumulative = %outcome.cumulative,
            "Point-to-point propagation complete"
        );
        Ok(true)
    }

    pub(crate) async fn chain_propagation(
        &self,
        chain_id: ChainId,
    ) -> Result<ChainPropagationResult, Fault> {
        let chain = self
            .chains
            .get_chain(chain_id)
            .await
            .map_err(Fault::store("load chain"))?
            .ok_or_else(|| Fault::not_found(EntityKind::Chain, chain_id))?;

        let links = chain.ordered_links();
        if links.is_empty() {
            return Err(ValidationReason::EmptyChain(chain_id).into());
        }
        validate_chain_links(&links)?;

        info!(
            chain_id = %chain_id,
            chain_name = %chain.name,
            processes = links.len(),
            "Starting chain propagation"
        );

        let graph = build_chain_graph(&links);
        let plan = kahns_topological_order(&graph)?;
        let sequence: Vec<i64> = links.iter().map(|link| link.sequence_order).collect();
        let steps = self
            .run_traversal(&graph, &[], &plan, TraversalMode::Chain, Some(&sequence))
            .await?;

        let summary = EmissionSummary::from_steps(&steps)?;
        info!(
            chain_id = %chain_id,
            steps = steps.len(),
            last_process_cumulative = %summary.last_process_cumulative,
            "Chain propagation complete"
        );

        Ok(ChainPropagationResult {
            chain_id,
            chain_name: chain.name,
            total_processes: links.len(),
            successful_propagations: steps.len(),
            steps,
            summary,
        })
    }

    pub(crate) async fn graph_propagation(
        &self,
        scope: GraphScope,
    ) -> Result<GraphPropagationResult, Fault> {
        let ScopedGraph { graph, upstream } = self.collect_graph(&scope).await?;
        // Cycles are rejected here, before the first write.
        let plan = kahns_topological_order(&graph)?;

        info!(
            processes = graph.node_count(),
            edges = graph.edge_count,
            levels = plan.levels.len(),
            "Starting graph propagation"
        );

        let steps = self
            .run_traversal(&graph, &upstream, &plan, TraversalMode::Graph, None)
            .await?;

        let levels = plan
            .levels
            .iter()
            .map(|level| level.iter().map(|&idx| graph.nodes[idx]).collect())
            .collect();
        let summary = EmissionSummary::from_steps(&steps)?;

        info!(
            steps = steps.len(),
            total_cumulative = %summary.total_cumulative_emissions,
            "Graph propagation complete"
        );

        Ok(GraphPropagationResult {
            total_processes: graph.node_count(),
            successful_propagations: steps.len(),
            steps,
            levels,
            summary,
        })
    }

    /// Visit nodes in plan order, one committed step each.
    ///
    /// A node's sources are its in-graph predecessors followed by its
    /// `upstream` entry, so a partial traversal still inherits from
    /// processes it does not rewrite.
    pub(crate) async fn run_traversal(
        &self,
        graph: &PropagationGraph,
        upstream: &[Vec<ProcessId>],
        plan: &TraversalPlan,
        mode: TraversalMode,
        sequence: Option<&[i64]>,
    ) -> Result<Vec<PropagationStep>, Fault> {
        let mut steps = Vec::with_capacity(plan.order.len());

        for &idx in &plan.order {
            let process_id = graph.nodes[idx];
            let mut sources = graph.predecessor_ids(idx);
            if let Some(outside) = upstream.get(idx) {
                sources.extend_from_slice(outside);
            }
            let outcome = self.apply_step(process_id, &sources).await?;

            let propagation_type = match (mode, sources.len()) {
                (TraversalMode::Chain, _) if idx == 0 => PropagationType::FirstProcess,
                (TraversalMode::Chain, 0) => PropagationType::NoContinueEdge,
                (TraversalMode::Chain, _) => PropagationType::ContinueEdge,
                (TraversalMode::Graph, 0) => PropagationType::Root,
                (TraversalMode::Graph, 1) => PropagationType::ContinueEdge,
                (TraversalMode::Graph, _) => PropagationType::FanIn,
            };

            debug!(
                process_id = %process_id,
                own = %outcome.own,
                cumulative = %outcome.cumulative,
                ?propagation_type,
                "Propagation step committed"
            );

            steps.push(PropagationStep {
                process_id,
                sequence_order: sequence.and_then(|orders| orders.get(idx).copied()),
                own_emission: outcome.own,
                cumulative_emission: outcome.cumulative,
                propagation_type,
                source_process_ids: sources,
            });
        }

        Ok(steps)
    }

    /// Build the in-scope `continue` graph without writing anything.
    async fn collect_graph(&self, scope: &GraphScope) -> Result<ScopedGraph, Fault> {
        let max_nodes = self.config.max_graph_nodes;
        let max_edges = self.config.max_edge_count;

        match scope {
            GraphScope::All => {
                let edges = self
                    .edges
                    .query_edges_by_kind(EdgeKind::Continue)
                    .await
                    .map_err(Fault::store("load continue edges"))?;
                let graph = build_edge_graph(&edges, max_nodes, max_edges)?;
                Ok(ScopedGraph {
                    upstream: vec![Vec::new(); graph.node_count()],
                    graph,
                })
            }
            GraphScope::From(roots) => {
                let mut graph = PropagationGraph::new();
                let mut queue = VecDeque::new();
                for &root in roots {
                    if graph.index_of(root).is_none() {
                        graph.add_node(root);
                        queue.push_back(root);
                    }
                }

                while let Some(process_id) = queue.pop_front() {
                    for edge in self.continue_edges(process_id).await? {
                        let (_, target) = edge.continue_endpoints()?;
                        let discovered = graph.index_of(target).is_none();
                        add_continue_edge(&mut graph, &edge)?;
                        if discovered {
                            queue.push_back(target);
                        }
                    }
                    check_limits(&graph, max_nodes, max_edges)?;
                }

                let upstream = self.upstream_predecessors(&graph).await?;
                Ok(ScopedGraph { graph, upstream })
            }
        }
    }

    /// `continue` predecessors of each node that the graph does not contain.
    async fn upstream_predecessors(
        &self,
        graph: &PropagationGraph,
    ) -> Result<Vec<Vec<ProcessId>>, Fault> {
        let edges = self
            .edges
            .query_edges_by_kind(EdgeKind::Continue)
            .await
            .map_err(Fault::store("load continue edges"))?;

        let mut upstream = vec![Vec::new(); graph.node_count()];
        for edge in &edges {
            let (from, to) = edge.continue_endpoints()?;
            if graph.index_of(from).is_some() {
                continue;
            }
            if let Some(idx) = graph.index_of(to) {
                let sources = &mut upstream[idx];
                if !sources.contains(&from) {
                    sources.push(from);
                }
            }
        }

        let outside: usize = upstream.iter().map(Vec::len).sum();
        if outside > 0 {
            debug!(outside, "Reading stored totals of out-of-scope predecessors");
        }
        Ok(upstream)
    }

    /// Outgoing `continue` edges, each validated as process → process.
    pub(crate) async fn continue_edges(&self, process_id: ProcessId) -> Result<Vec<Edge>, Fault> {
        let edges = self
            .edges
            .query_continue_edges(process_id)
            .await
            .map_err(Fault::store("load continue edges"))?;
        for edge in &edges {
            edge.continue_endpoints()?;
        }
        Ok(edges)
    }
}
