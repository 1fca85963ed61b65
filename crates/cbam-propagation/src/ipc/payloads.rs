//! Request/response payloads for emission accounting
//!
//! Every request carries a correlation id that is echoed in the response.

use crate::domain::entities::{
    ChainPropagationResult, ChainRegistration, ChainSummary, DetectedChain, Edge,
    EmissionRecord, GraphPropagationResult, ProductEmissionTotal,
};
use crate::domain::errors::{EmissionError, ErrorKind, Operation};
use crate::domain::value_objects::{ChainId, GraphScope, ProcessId, ProductId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================
// INCOMING REQUESTS
// ============================================================

/// One emission accounting operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum EmissionRequest {
    CalculateAttribution {
        process_id: ProcessId,
    },
    PropagatePoint {
        source_id: ProcessId,
        target_id: ProcessId,
    },
    PropagateChain {
        chain_id: ChainId,
    },
    /// No roots means the whole `continue` graph.
    PropagateGraph {
        #[serde(default)]
        roots: Option<Vec<ProcessId>>,
    },
    GetContinueEdges {
        process_id: ProcessId,
    },
    SummarizeChain {
        chain_id: ChainId,
    },
    AggregateProduct {
        product_id: ProductId,
    },
    DetectChains {
        #[serde(default)]
        max_chain_length: Option<usize>,
    },
    RegisterDetectedChains {
        #[serde(default)]
        max_chain_length: Option<usize>,
    },
}

impl EmissionRequest {
    pub fn operation(&self) -> Operation {
        match self {
            EmissionRequest::CalculateAttribution { .. } => Operation::CalculateAttribution,
            EmissionRequest::PropagatePoint { .. } => Operation::PropagatePoint,
            EmissionRequest::PropagateChain { .. } => Operation::PropagateChain,
            EmissionRequest::PropagateGraph { .. } => Operation::PropagateGraph,
            EmissionRequest::GetContinueEdges { .. } => Operation::GetContinueEdges,
            EmissionRequest::SummarizeChain { .. } => Operation::SummarizeChain,
            EmissionRequest::AggregateProduct { .. } => Operation::AggregateProduct,
            EmissionRequest::DetectChains { .. } => Operation::DetectChains,
            EmissionRequest::RegisterDetectedChains { .. } => Operation::RegisterDetectedChains,
        }
    }

    /// Graph scope of a `PropagateGraph` request.
    pub fn graph_scope(roots: Option<Vec<ProcessId>>) -> GraphScope {
        roots.map_or(GraphScope::All, GraphScope::From)
    }
}

/// Request with its correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Correlation ID for response tracking
    pub correlation_id: Uuid,
    pub request: EmissionRequest,
}

impl RequestEnvelope {
    pub fn new(request: EmissionRequest) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            request,
        }
    }
}

// ============================================================
// OUTGOING RESPONSES
// ============================================================

/// Successful operation output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum EmissionResponsePayload {
    Attribution(EmissionRecord),
    PointPropagation(bool),
    ChainPropagation(ChainPropagationResult),
    GraphPropagation(GraphPropagationResult),
    ContinueEdges(Vec<Edge>),
    ChainSummary(ChainSummary),
    ProductTotal(ProductEmissionTotal),
    DetectedChains(Vec<DetectedChain>),
    ChainRegistration(ChainRegistration),
}

/// Failure description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub operation: Operation,
    /// Full message, including operation and identifiers
    pub message: String,
}

impl From<&EmissionError> for ErrorPayload {
    fn from(error: &EmissionError) -> Self {
        Self {
            kind: error.kind(),
            operation: error.operation(),
            message: error.to_string(),
        }
    }
}

/// Response to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Correlation ID from request
    pub correlation_id: Uuid,
    /// Whether the operation succeeded
    pub success: bool,
    pub payload: Option<EmissionResponsePayload>,
    /// Error (if failed)
    pub error: Option<ErrorPayload>,
    /// Time taken (ms)
    pub elapsed_ms: u64,
}
