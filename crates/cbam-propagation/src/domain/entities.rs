//! Core entities for emission propagation

use super::errors::ValidationReason;
use super::invariants::checked_total;
use super::value_objects::{
    ChainId, EdgeId, EdgeKind, Emission, InputId, NodeRef, ProcessId, ProductId,
    PropagationType,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Production step
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,
    pub name: String,
    #[serde(default)]
    pub install_id: Option<i64>,
    #[serde(default)]
    pub start_period: Option<NaiveDate>,
    #[serde(default)]
    pub end_period: Option<NaiveDate>,
}

impl Process {
    pub fn new(id: ProcessId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            install_id: None,
            start_period: None,
            end_period: None,
        }
    }

    pub fn with_period(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_period = Some(start);
        self.end_period = Some(end);
        self
    }

    /// `start_period <= end_period` when both are set.
    pub fn has_valid_period(&self) -> bool {
        valid_period(self.start_period, self.end_period)
    }
}

/// Manufactured good
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub start_period: Option<NaiveDate>,
    #[serde(default)]
    pub end_period: Option<NaiveDate>,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            start_period: None,
            end_period: None,
        }
    }

    pub fn has_valid_period(&self) -> bool {
        valid_period(self.start_period, self.end_period)
    }
}

fn valid_period(start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    match (start, end) {
        (Some(start), Some(end)) => start <= end,
        _ => true,
    }
}

/// Product ↔ process join row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductProcess {
    pub product_id: ProductId,
    pub process_id: ProcessId,
    #[serde(default)]
    pub consume_amount: Option<Emission>,
}

fn default_oxyfactor() -> Emission {
    Emission::from_units(1)
}

/// Material consumed by a process
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialInput {
    pub id: InputId,
    pub process_id: ProcessId,
    pub name: String,
    pub amount: Emission,
    pub factor: Emission,
    #[serde(default = "default_oxyfactor")]
    pub oxyfactor: Emission,
}

impl MaterialInput {
    /// `amount × factor × oxyfactor`
    pub fn emission(&self) -> Result<Emission, ValidationReason> {
        input_emission(
            self.id,
            self.process_id,
            self.amount,
            self.factor,
            self.oxyfactor,
        )
    }
}

/// Fuel burned by a process
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelInput {
    pub id: InputId,
    pub process_id: ProcessId,
    pub name: String,
    pub amount: Emission,
    pub factor: Emission,
    #[serde(default = "default_oxyfactor")]
    pub oxyfactor: Emission,
}

impl FuelInput {
    /// `amount × factor × oxyfactor`
    pub fn emission(&self) -> Result<Emission, ValidationReason> {
        input_emission(
            self.id,
            self.process_id,
            self.amount,
            self.factor,
            self.oxyfactor,
        )
    }
}

fn input_emission(
    input_id: InputId,
    process_id: ProcessId,
    amount: Emission,
    factor: Emission,
    oxyfactor: Emission,
) -> Result<Emission, ValidationReason> {
    for (field, value) in [("amount", amount), ("factor", factor), ("oxyfactor", oxyfactor)] {
        if value.is_negative() {
            return Err(ValidationReason::NegativeInput { input_id, field });
        }
    }
    amount
        .scale(factor)
        .and_then(|partial| partial.scale(oxyfactor))
        .ok_or(ValidationReason::EmissionOverflow(process_id))
}

/// Per-process emission record (direct and cumulative)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionRecord {
    pub process_id: ProcessId,
    pub total_matdir_emission: Emission,
    pub total_fueldir_emission: Emission,
    pub attrdir_em: Emission,
    /// Absent until propagation has run since the last attribution
    #[serde(default)]
    pub cumulative_emission: Option<Emission>,
    /// When attribution last ran
    pub calculation_date: DateTime<Utc>,
    /// Last write of any kind
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Bumped on every write; used for compare-and-set
    #[serde(default)]
    pub version: u64,
}

impl EmissionRecord {
    /// Cumulative value, or the direct emission if never propagated.
    pub fn effective_cumulative(&self) -> Emission {
        self.cumulative_emission.unwrap_or(self.attrdir_em)
    }

    /// Name of the first quantity below zero, if any.
    pub fn negative_field(&self) -> Option<&'static str> {
        [
            ("total_matdir_emission", Some(self.total_matdir_emission)),
            ("total_fueldir_emission", Some(self.total_fueldir_emission)),
            ("attrdir_em", Some(self.attrdir_em)),
            ("cumulative_emission", self.cumulative_emission),
        ]
        .into_iter()
        .find(|(_, value)| value.is_some_and(Emission::is_negative))
        .map(|(name, _)| name)
    }
}

/// Attribution write (upsert by process id)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionUpdate {
    pub process_id: ProcessId,
    pub total_matdir_emission: Emission,
    pub total_fueldir_emission: Emission,
    pub attrdir_em: Emission,
    pub calculation_date: DateTime<Utc>,
}

/// Edge row as stored, kind not yet parsed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub source: NodeRef,
    pub target: NodeRef,
    pub kind: String,
}

impl EdgeRecord {
    /// Parse the kind and check the endpoints against it.
    pub fn parse(&self) -> Result<Edge, ValidationReason> {
        let kind = self
            .kind
            .parse::<EdgeKind>()
            .map_err(|e| ValidationReason::UnknownEdgeKind(e.0))?;
        let edge = Edge {
            id: self.id,
            source: self.source,
            target: self.target,
            kind,
        };
        edge.validate()?;
        Ok(edge)
    }
}

/// Typed edge between two nodes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeRef,
    pub target: NodeRef,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn continue_edge(id: EdgeId, from: ProcessId, to: ProcessId) -> Self {
        Self {
            id,
            source: NodeRef::process(from),
            target: NodeRef::process(to),
            kind: EdgeKind::Continue,
        }
    }

    /// Endpoint node types must match the kind.
    pub fn validate(&self) -> Result<(), ValidationReason> {
        let (from_type, to_type) = self.kind.endpoints();
        if self.source.node_type != from_type || self.target.node_type != to_type {
            return Err(ValidationReason::EndpointMismatch {
                edge_id: self.id,
                kind: self.kind,
                from_type: self.source.node_type,
                to_type: self.target.node_type,
            });
        }
        Ok(())
    }

    /// `(source, target)` process ids of a valid `continue` edge.
    pub fn continue_endpoints(&self) -> Result<(ProcessId, ProcessId), ValidationReason> {
        self.validate()?;
        match (self.kind, self.source.as_process(), self.target.as_process()) {
            (EdgeKind::Continue, Some(from), Some(to)) => Ok((from, to)),
            _ => Err(ValidationReason::EndpointMismatch {
                edge_id: self.id,
                kind: self.kind,
                from_type: self.source.node_type,
                to_type: self.target.node_type,
            }),
        }
    }
}

/// Ordered chain membership
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    pub chain_id: ChainId,
    pub process_id: ProcessId,
    pub sequence_order: i64,
    pub is_continue_edge: bool,
}

/// Named production chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessChain {
    pub id: ChainId,
    pub name: String,
    pub is_active: bool,
    pub links: Vec<ChainLink>,
}

impl ProcessChain {
    /// Links sorted by sequence order.
    pub fn ordered_links(&self) -> Vec<ChainLink> {
        let mut links = self.links.clone();
        links.sort_by_key(|link| link.sequence_order);
        links
    }
}

/// Link of a chain not yet saved
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChainLink {
    pub process_id: ProcessId,
    pub sequence_order: i64,
    pub is_continue_edge: bool,
}

/// Chain not yet saved
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChain {
    pub name: String,
    pub links: Vec<NewChainLink>,
}

/// One traversal step
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationStep {
    pub process_id: ProcessId,
    /// Chain mode only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_order: Option<i64>,
    pub own_emission: Emission,
    pub cumulative_emission: Emission,
    pub propagation_type: PropagationType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_process_ids: Vec<ProcessId>,
}

impl PropagationStep {
    /// The single upstream process, for point-to-point steps.
    pub fn source_process_id(&self) -> Option<ProcessId> {
        match self.source_process_ids.as_slice() {
            [single] => Some(*single),
            _ => None,
        }
    }
}

/// Totals over a traversal
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionSummary {
    pub total_own_emissions: Emission,
    pub total_cumulative_emissions: Emission,
    pub last_process_cumulative: Emission,
}

impl EmissionSummary {
    /// Fails when a total leaves the representable range, even though every
    /// step on its own fit.
    pub fn from_steps(steps: &[PropagationStep]) -> Result<Self, ValidationReason> {
        Ok(Self {
            total_own_emissions: checked_total(
                steps.iter().map(|s| (s.process_id, s.own_emission)),
            )?,
            total_cumulative_emissions: checked_total(
                steps.iter().map(|s| (s.process_id, s.cumulative_emission)),
            )?,
            last_process_cumulative: steps
                .last()
                .map(|s| s.cumulative_emission)
                .unwrap_or(Emission::ZERO),
        })
    }
}

/// Result of chain-mode propagation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainPropagationResult {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub total_processes: usize,
    pub successful_propagations: usize,
    pub steps: Vec<PropagationStep>,
    pub summary: EmissionSummary,
}

/// Result of graph-mode propagation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphPropagationResult {
    pub total_processes: usize,
    pub successful_propagations: usize,
    pub steps: Vec<PropagationStep>,
    /// Processes grouped by topological level (roots at level 0)
    pub levels: Vec<Vec<ProcessId>>,
    pub summary: EmissionSummary,
}

/// Chain report row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSummaryRow {
    pub sequence_order: i64,
    pub process_id: ProcessId,
    pub process_name: String,
    pub own_emission: Emission,
    pub cumulative_emission: Emission,
    pub calculation_date: Option<DateTime<Utc>>,
}

/// Chain report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub rows: Vec<ChainSummaryRow>,
    pub total_own_emissions: Emission,
    pub total_cumulative_emissions: Emission,
    pub total_matdir_emission: Emission,
    pub total_fueldir_emission: Emission,
}

/// Per-process line of a product total
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEmissionBreakdown {
    pub process_id: ProcessId,
    pub process_name: String,
    pub attrdir_em: Emission,
    pub cumulative_emission: Option<Emission>,
    /// False when the process has no emission record
    pub calculated: bool,
}

/// Product emission total
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductEmissionTotal {
    pub product_id: ProductId,
    pub product_name: String,
    pub process_count: usize,
    pub total_attrdir_emission: Emission,
    pub total_cumulative_emission: Emission,
    pub unpropagated_processes: usize,
    pub processes: Vec<ProcessEmissionBreakdown>,
}

/// Linear `continue` path found by the detector
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedChain {
    pub processes: Vec<ProcessId>,
}

impl DetectedChain {
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// `chain-<start>-<end>`
    pub fn name(&self) -> String {
        match (self.processes.first(), self.processes.last()) {
            (Some(start), Some(end)) => format!("chain-{start}-{end}"),
            _ => "chain-empty".to_string(),
        }
    }

    /// Links `1..=n`, all flagged as continue edges.
    pub fn to_new_chain(&self) -> NewChain {
        NewChain {
            name: self.name(),
            links: self
                .processes
                .iter()
                .zip(1..)
                .map(|(process_id, sequence_order)| NewChainLink {
                    process_id: *process_id,
                    sequence_order,
                    is_continue_edge: true,
                })
                .collect(),
        }
    }
}

/// Chain saved by auto-registration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredChain {
    pub chain_id: ChainId,
    pub name: String,
    pub processes: Vec<ProcessId>,
}

/// Outcome of chain auto-registration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRegistration {
    pub deactivated_chains: usize,
    pub chains: Vec<RegisteredChain>,
}

/// Arena-indexed `continue` graph used by the traversal core
#[derive(Debug, Clone, Default)]
pub struct PropagationGraph {
    /// Process at each arena index, in discovery order
    pub nodes: Vec<ProcessId>,
    /// Process id -> arena index
    pub index: HashMap<ProcessId, usize>,
    /// Successors by arena index
    pub adjacency: Vec<Vec<usize>>,
    /// Predecessors by arena index
    pub predecessors: Vec<Vec<usize>>,
    /// In-degree by arena index
    pub in_degree: Vec<usize>,
    pub edge_count: usize,
}

impl PropagationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a process, returning its arena index. Re-adding is a no-op.
    pub fn add_node(&mut self, process_id: ProcessId) -> usize {
        if let Some(&idx) = self.index.get(&process_id) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(process_id);
        self.index.insert(process_id, idx);
        self.adjacency.push(Vec::new());
        self.predecessors.push(Vec::new());
        self.in_degree.push(0);
        idx
    }

    /// Add `from -> to`, adding missing nodes. Returns false for a duplicate.
    pub fn add_edge(&mut self, from: ProcessId, to: ProcessId) -> bool {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        if self.adjacency[from_idx].contains(&to_idx) {
            return false;
        }
        self.adjacency[from_idx].push(to_idx);
        self.predecessors[to_idx].push(from_idx);
        self.in_degree[to_idx] += 1;
        self.edge_count += 1;
        true
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, process_id: ProcessId) -> Option<usize> {
        self.index.get(&process_id).copied()
    }

    pub fn predecessor_ids(&self, idx: usize) -> Vec<ProcessId> {
        self.predecessors
            .get(idx)
            .map(|preds| preds.iter().map(|&p| self.nodes[p]).collect())
            .unwrap_or_default()
    }
}

/// Visit order produced by Kahn's algorithm
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TraversalPlan {
    /// Arena indices in visit order
    pub order: Vec<usize>,
    /// Arena indices grouped by topological level
    pub levels: Vec<Vec<usize>>,
}
