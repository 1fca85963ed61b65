//! Adapters for emission propagation
//!
//! In-memory reference implementation of the outbound ports, seeded
//! programmatically or from a serde `Dataset`.

mod dataset;
mod memory;

pub use dataset::Dataset;
pub use memory::InMemoryCbamStore;
