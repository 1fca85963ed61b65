//! Ports module for emission propagation
//!
//! Defines inbound (API) and outbound (SPI) port traits.

pub mod inbound;
pub mod outbound;

pub use inbound::EmissionAccountingApi;
pub use outbound::{
    Catalog, ChainStore, EdgeGraph, EmissionStore, FixedTimeSource, InputLedger,
    SystemTimeSource, TimeSource,
};
