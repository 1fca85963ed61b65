//! Serde snapshot used to seed the in-memory store

use crate::domain::entities::{
    EdgeRecord, EmissionRecord, FuelInput, MaterialInput, Process, ProcessChain, Product,
    ProductProcess,
};
use serde::{Deserialize, Serialize};

/// Full contents of an in-memory store.
///
/// Edges keep their kind as text so malformed rows are caught on load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub processes: Vec<Process>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub product_processes: Vec<ProductProcess>,
    #[serde(default)]
    pub material_inputs: Vec<MaterialInput>,
    #[serde(default)]
    pub fuel_inputs: Vec<FuelInput>,
    #[serde(default)]
    pub emission_records: Vec<EmissionRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
    #[serde(default)]
    pub chains: Vec<ProcessChain>,
}
