//! # CBAM Emission Propagation
//!
//! Direct emission attribution per process and cumulative propagation along
//! `continue` edges, using Kahn's topological traversal for both chain and
//! graph modes.
//!
//! ## Architecture
//!
//! - **Domain**: Core entities (EmissionRecord, Edge, ProcessChain, PropagationGraph),
//!   the fixed-point `Emission` quantity, errors and invariants
//! - **Algorithms**: Graph building, Kahn's traversal, chain detection
//! - **Ports**: Inbound (EmissionAccountingApi) and Outbound (EmissionStore, EdgeGraph,
//!   ChainStore, Catalog, InputLedger, TimeSource)
//! - **Application**: Service orchestration
//! - **Adapters**: In-memory reference store
//! - **IPC**: Request/response handler for the driving side
//!
//! ## Propagation rule
//!
//! ```text
//! target.cumulative = Σ predecessor.cumulative + target.attrdir_em
//! ```
//!
//! A process without `continue` predecessors accumulates only its own direct
//! emission.

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ipc;
pub mod ports;

pub use adapters::{Dataset, InMemoryCbamStore};
pub use application::service::{EmissionAccountingDependencies, EmissionAccountingService};
pub use config::PropagationConfig;
pub use domain::entities::*;
pub use domain::errors::{
    EmissionError, EntityKind, ErrorKind, Fault, Operation, StoreError, ValidationReason,
};
pub use domain::value_objects::*;
pub use ipc::{
    EmissionRequest, EmissionRequestHandler, EmissionResponsePayload, ErrorPayload, RequestEnvelope,
    ResponseEnvelope,
};
pub use ports::inbound::EmissionAccountingApi;
pub use ports::outbound::{
    Catalog, ChainStore, EdgeGraph, EmissionStore, FixedTimeSource, InputLedger, SystemTimeSource,
    TimeSource,
};
