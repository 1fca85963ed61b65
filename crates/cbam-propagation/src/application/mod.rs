//! Application layer for emission propagation

pub mod service;

pub use service::{EmissionAccountingDependencies, EmissionAccountingService};
