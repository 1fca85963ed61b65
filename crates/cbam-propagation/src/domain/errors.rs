//! Error types for emission propagation
//!
//! Every error returned through the inbound API carries the operation that
//! failed and the identifiers involved. Algorithms and helpers return the
//! operation-less [`Fault`], which the service stamps with its operation.

use crate::domain::value_objects::{
    ChainId, EdgeId, EdgeKind, Emission, InputId, NodeType, ProcessId,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Inbound operation names, used in every error and log line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CalculateAttribution,
    PropagatePoint,
    PropagateChain,
    PropagateGraph,
    GetContinueEdges,
    SummarizeChain,
    AggregateProduct,
    DetectChains,
    RegisterDetectedChains,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CalculateAttribution => "calculate_attribution",
            Operation::PropagatePoint => "propagate_point",
            Operation::PropagateChain => "propagate_chain",
            Operation::PropagateGraph => "propagate_graph",
            Operation::GetContinueEdges => "get_continue_edges",
            Operation::SummarizeChain => "summarize_chain",
            Operation::AggregateProduct => "aggregate_product",
            Operation::DetectChains => "detect_chains",
            Operation::RegisterDetectedChains => "register_detected_chains",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What could not be found
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Process,
    Product,
    Chain,
    EmissionRecord,
    /// Material and fuel inputs of a process
    Inputs,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Process => "process",
            EntityKind::Product => "product",
            EntityKind::Chain => "chain",
            EntityKind::EmissionRecord => "emission record",
            EntityKind::Inputs => "material/fuel inputs",
        };
        f.write_str(name)
    }
}

/// Why a request or stored datum was rejected
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationReason {
    #[error("unknown edge kind '{0}'")]
    UnknownEdgeKind(String),

    #[error("edge {edge_id} of kind {kind} cannot connect {from_type} to {to_type}")]
    EndpointMismatch {
        edge_id: EdgeId,
        kind: EdgeKind,
        from_type: NodeType,
        to_type: NodeType,
    },

    #[error("process {process_id} has non-positive sequence order {sequence_order}")]
    NonPositiveSequence {
        process_id: ProcessId,
        sequence_order: i64,
    },

    #[error("process {process_id} has sequence order {current} not greater than {previous}")]
    NonIncreasingSequence {
        process_id: ProcessId,
        previous: i64,
        current: i64,
    },

    #[error("process {0} appears more than once in the chain")]
    DuplicateChainMember(ProcessId),

    #[error("chain {0} has no links")]
    EmptyChain(ChainId),

    #[error("input {input_id} has negative {field}")]
    NegativeInput { input_id: InputId, field: &'static str },

    #[error("process {process_id} attrdir_em {attrdir} differs from matdir + fueldir {expected}")]
    AttributionMismatch {
        process_id: ProcessId,
        attrdir: Emission,
        expected: Emission,
    },

    #[error("process {process_id} cumulative {cumulative} is below its direct emission {attrdir}")]
    CumulativeBelowDirect {
        process_id: ProcessId,
        cumulative: Emission,
        attrdir: Emission,
    },

    #[error("emission total overflow at process {0}")]
    EmissionOverflow(ProcessId),

    #[error("process {0} cannot propagate into itself")]
    SelfPropagation(ProcessId),

    #[error("graph has {count} processes, limit is {max}")]
    TooManyNodes { count: usize, max: usize },

    #[error("graph has {count} continue edges, limit is {max}")]
    TooManyEdges { count: usize, max: usize },

    #[error("chain length {requested} is below the minimum of {min}")]
    ChainLengthTooShort { requested: usize, min: usize },

    #[error("chain length {requested} exceeds the configured limit {max}")]
    ChainLengthTooLong { requested: usize, max: usize },
}

/// Failure reported by a persistence port
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("version conflict on process {process_id}: expected {expected}, found {actual}")]
    VersionConflict {
        process_id: ProcessId,
        expected: u64,
        actual: u64,
    },

    #[error("internal store error: {0}")]
    Internal(String),
}

/// Coarse error category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Validation,
    Cycle,
    Store,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::Cycle => "cycle",
            ErrorKind::Store => "store",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All errors returned by the emission accounting API
#[derive(Debug, Error)]
pub enum EmissionError {
    #[error("{operation}: {entity} {id} not found")]
    NotFound {
        operation: Operation,
        entity: EntityKind,
        id: i64,
    },

    #[error("{operation}: {reason}")]
    Validation {
        operation: Operation,
        reason: ValidationReason,
    },

    #[error("{operation}: cycle detected among processes {}", join_ids(.processes))]
    Cycle {
        operation: Operation,
        processes: Vec<ProcessId>,
    },

    #[error("{operation}: {context}: {source}")]
    Store {
        operation: Operation,
        context: String,
        source: StoreError,
    },
}

impl EmissionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmissionError::NotFound { .. } => ErrorKind::NotFound,
            EmissionError::Validation { .. } => ErrorKind::Validation,
            EmissionError::Cycle { .. } => ErrorKind::Cycle,
            EmissionError::Store { .. } => ErrorKind::Store,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            EmissionError::NotFound { operation, .. }
            | EmissionError::Validation { operation, .. }
            | EmissionError::Cycle { operation, .. }
            | EmissionError::Store { operation, .. } => *operation,
        }
    }
}

fn join_ids(ids: &[ProcessId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Operation-less failure raised below the service layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    NotFound { entity: EntityKind, id: i64 },
    Validation(ValidationReason),
    Cycle(Vec<ProcessId>),
    Store { context: String, source: StoreError },
}

impl Fault {
    pub fn not_found(entity: EntityKind, id: impl Into<i64>) -> Self {
        Fault::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Adapter for `map_err` on port calls.
    pub fn store(context: &'static str) -> impl FnOnce(StoreError) -> Fault {
        move |source| Fault::Store {
            context: context.to_string(),
            source,
        }
    }

    /// Attach the failing operation.
    pub fn during(self, operation: Operation) -> EmissionError {
        match self {
            Fault::NotFound { entity, id } => EmissionError::NotFound {
                operation,
                entity,
                id,
            },
            Fault::Validation(reason) => EmissionError::Validation { operation, reason },
            Fault::Cycle(processes) => EmissionError::Cycle {
                operation,
                processes,
            },
            Fault::Store { context, source } => EmissionError::Store {
                operation,
                context,
                source,
            },
        }
    }
}

impl From<ValidationReason> for Fault {
    fn from(reason: ValidationReason) -> Self {
        Fault::Validation(reason)
    }
}
