//! In-memory reference store
//!
//! Implements every outbound persistence port over one set of tables behind
//! a `parking_lot::RwLock`. Clones share the same tables, so one instance can
//! be handed to the service once per port.

use super::dataset::Dataset;
use crate::domain::entities::{
    AttributionUpdate, ChainLink, Edge, EdgeRecord, EmissionRecord, FuelInput, MaterialInput,
    NewChain, Process, ProcessChain, Product, ProductProcess,
};
use crate::domain::errors::StoreError;
use crate::domain::value_objects::{
    ChainId, EdgeId, EdgeKind, Emission, NodeRef, ProcessId, ProductId,
};
use crate::ports::outbound::{Catalog, ChainStore, EdgeGraph, EmissionStore, InputLedger};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Tables {
    processes: BTreeMap<ProcessId, Process>,
    products: BTreeMap<ProductId, Product>,
    product_processes: Vec<ProductProcess>,
    materials: Vec<MaterialInput>,
    fuels: Vec<FuelInput>,
    emissions: BTreeMap<ProcessId, EmissionRecord>,
    edges: Vec<Edge>,
    chains: BTreeMap<ChainId, ProcessChain>,
}

impl Tables {
    fn next_edge_id(&self) -> EdgeId {
        EdgeId(self.edges.iter().map(|e| e.id.0).max().unwrap_or(0) + 1)
    }

    fn next_chain_id(&self) -> ChainId {
        ChainId(self.chains.keys().map(|id| id.0).max().unwrap_or(0) + 1)
    }
}

/// Shared in-memory CBAM store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCbamStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryCbamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a dataset, validating periods, edges and chain links.
    pub fn from_dataset(dataset: Dataset) -> Result<Self, StoreError> {
        let store = Self::new();

        for process in dataset.processes {
            store.insert_process(process)?;
        }
        for product in dataset.products {
            store.insert_product(product)?;
        }
        for row in dataset.product_processes {
            store.link_product_process(row);
        }
        for input in dataset.material_inputs {
            store.insert_material_input(input);
        }
        for input in dataset.fuel_inputs {
            store.insert_fuel_input(input);
        }
        for record in dataset.emission_records {
            store.put_emission_record(record)?;
        }
        for edge in dataset.edges {
            store.insert_edge(edge)?;
        }
        for chain in dataset.chains {
            store.insert_chain(chain)?;
        }

        Ok(store)
    }

    pub fn insert_process(&self, process: Process) -> Result<(), StoreError> {
        if !process.has_valid_period() {
            return Err(StoreError::Constraint(format!(
                "process {} starts after it ends",
                process.id
            )));
        }
        self.tables.write().processes.insert(process.id, process);
        Ok(())
    }

    pub fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        if !product.has_valid_period() {
            return Err(StoreError::Constraint(format!(
                "product {} starts after it ends",
                product.id
            )));
        }
        self.tables.write().products.insert(product.id, product);
        Ok(())
    }

    pub fn link_product_process(&self, row: ProductProcess) {
        self.tables.write().product_processes.push(row);
    }

    pub fn insert_material_input(&self, input: MaterialInput) {
        self.tables.write().materials.push(input);
    }

    pub fn insert_fuel_input(&self, input: FuelInput) {
        self.tables.write().fuels.push(input);
    }

    /// Insert or overwrite an emission record. Quantities must not be
    /// negative.
    pub fn put_emission_record(&self, record: EmissionRecord) -> Result<(), StoreError> {
        if let Some(field) = record.negative_field() {
            return Err(StoreError::Constraint(format!(
                "emission record for process {} has negative {field}",
                record.process_id
            )));
        }
        self.tables
            .write()
            .emissions
            .insert(record.process_id, record);
        Ok(())
    }

    /// Remove a process from the catalog, keeping its other rows.
    pub fn remove_process(&self, process_id: ProcessId) -> Option<Process> {
        self.tables.write().processes.remove(&process_id)
    }

    /// Parse and insert an edge row.
    pub fn insert_edge(&self, record: EdgeRecord) -> Result<Edge, StoreError> {
        let edge = record
            .parse()
            .map_err(|reason| StoreError::Constraint(reason.to_string()))?;
        let mut tables = self.tables.write();
        if tables.edges.iter().any(|existing| existing.id == edge.id) {
            return Err(StoreError::Constraint(format!(
                "duplicate edge id {}",
                edge.id
            )));
        }
        tables.edges.push(edge);
        Ok(edge)
    }

    /// Insert a `continue` edge with the next free id.
    pub fn insert_continue_edge(&self, from: ProcessId, to: ProcessId) -> Edge {
        let mut tables = self.tables.write();
        let edge = Edge::continue_edge(tables.next_edge_id(), from, to);
        tables.edges.push(edge);
        edge
    }

    /// Insert a chain with its own id; links must carry that id.
    pub fn insert_chain(&self, chain: ProcessChain) -> Result<(), StoreError> {
        if let Some(link) = chain.links.iter().find(|link| link.chain_id != chain.id) {
            return Err(StoreError::Constraint(format!(
                "link for process {} belongs to chain {}, not {}",
                link.process_id, link.chain_id, chain.id
            )));
        }
        self.tables.write().chains.insert(chain.id, chain);
        Ok(())
    }

    /// Snapshot of one emission record.
    pub fn emission_record(&self, process_id: ProcessId) -> Option<EmissionRecord> {
        self.tables.read().emissions.get(&process_id).cloned()
    }

    /// Active chains ordered by id.
    pub fn active_chains(&self) -> Vec<ProcessChain> {
        self.tables
            .read()
            .chains
            .values()
            .filter(|chain| chain.is_active)
            .cloned()
            .collect()
    }

    /// Copy the full contents back into a dataset.
    pub fn snapshot(&self) -> Dataset {
        let tables = self.tables.read();
        Dataset {
            processes: tables.processes.values().cloned().collect(),
            products: tables.products.values().cloned().collect(),
            product_processes: tables.product_processes.clone(),
            material_inputs: tables.materials.clone(),
            fuel_inputs: tables.fuels.clone(),
            emission_records: tables.emissions.values().cloned().collect(),
            edges: tables
                .edges
                .iter()
                .map(|edge| EdgeRecord {
                    id: edge.id,
                    source: edge.source,
                    target: edge.target,
                    kind: edge.kind.as_str().to_string(),
                })
                .collect(),
            chains: tables.chains.values().cloned().collect(),
        }
    }
}

#[async_trait]
impl EmissionStore for InMemoryCbamStore {
    async fn get(&self, process_id: ProcessId) -> Result<Option<EmissionRecord>, StoreError> {
        Ok(self.emission_record(process_id))
    }

    async fn upsert_attribution(
        &self,
        update: AttributionUpdate,
    ) -> Result<EmissionRecord, StoreError> {
        let mut tables = self.tables.write();
        let version = tables
            .emissions
            .get(&update.process_id)
            .map_or(1, |existing| existing.version + 1);

        let record = EmissionRecord {
            process_id: update.process_id,
            total_matdir_emission: update.total_matdir_emission,
            total_fueldir_emission: update.total_fueldir_emission,
            attrdir_em: update.attrdir_em,
            cumulative_emission: None,
            calculation_date: update.calculation_date,
            updated_at: Some(update.calculation_date),
            version,
        };
        tables.emissions.insert(update.process_id, record.clone());
        Ok(record)
    }

    async fn compare_and_set_cumulative(
        &self,
        process_id: ProcessId,
        expected_version: u64,
        cumulative: Emission,
        at: DateTime<Utc>,
    ) -> Result<EmissionRecord, StoreError> {
        let mut tables = self.tables.write();
        let record = tables.emissions.get_mut(&process_id).ok_or_else(|| {
            StoreError::Constraint(format!("no emission record for process {process_id}"))
        })?;

        if record.version != expected_version {
            return Err(StoreError::VersionConflict {
                process_id,
                expected: expected_version,
                actual: record.version,
            });
        }

        record.cumulative_emission = Some(cumulative);
        record.updated_at = Some(at);
        record.version += 1;
        Ok(record.clone())
    }
}

#[async_trait]
impl EdgeGraph for InMemoryCbamStore {
    async fn query_continue_edges(&self, source: ProcessId) -> Result<Vec<Edge>, StoreError> {
        let source = NodeRef::process(source);
        Ok(self
            .tables
            .read()
            .edges
            .iter()
            .filter(|edge| edge.kind == EdgeKind::Continue && edge.source == source)
            .copied()
            .collect())
    }

    async fn query_edges_by_kind(&self, kind: EdgeKind) -> Result<Vec<Edge>, StoreError> {
        Ok(self
            .tables
            .read()
            .edges
            .iter()
            .filter(|edge| edge.kind == kind)
            .copied()
            .collect())
    }
}

#[async_trait]
impl ChainStore for InMemoryCbamStore {
    async fn get_chain(&self, chain_id: ChainId) -> Result<Option<ProcessChain>, StoreError> {
        Ok(self.tables.read().chains.get(&chain_id).cloned())
    }

    async fn save_chain(&self, chain: NewChain) -> Result<ProcessChain, StoreError> {
        let mut tables = self.tables.write();
        let id = tables.next_chain_id();
        let saved = ProcessChain {
            id,
            name: chain.name,
            is_active: true,
            links: chain
                .links
                .into_iter()
                .map(|link| ChainLink {
                    chain_id: id,
                    process_id: link.process_id,
                    sequence_order: link.sequence_order,
                    is_continue_edge: link.is_continue_edge,
                })
                .collect(),
        };
        tables.chains.insert(id, saved.clone());
        Ok(saved)
    }

    async fn deactivate_all_chains(&self) -> Result<usize, StoreError> {
        let mut tables = self.tables.write();
        let mut changed = 0;
        for chain in tables.chains.values_mut().filter(|chain| chain.is_active) {
            chain.is_active = false;
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl Catalog for InMemoryCbamStore {
    async fn get_process(&self, process_id: ProcessId) -> Result<Option<Process>, StoreError> {
        Ok(self.tables.read().processes.get(&process_id).cloned())
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.tables.read().products.get(&product_id).cloned())
    }

    async fn processes_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Process>, StoreError> {
        let tables = self.tables.read();
        let ids: BTreeSet<ProcessId> = tables
            .product_processes
            .iter()
            .filter(|row| row.product_id == product_id)
            .map(|row| row.process_id)
            .collect();
        Ok(ids
            .into_iter()
            .filter_map(|id| tables.processes.get(&id).cloned())
            .collect())
    }
}

#[async_trait]
impl InputLedger for InMemoryCbamStore {
    async fn material_inputs(
        &self,
        process_id: ProcessId,
    ) -> Result<Vec<MaterialInput>, StoreError> {
        Ok(self
            .tables
            .read()
            .materials
            .iter()
            .filter(|input| input.process_id == process_id)
            .cloned()
            .collect())
    }

    async fn fuel_inputs(&self, process_id: ProcessId) -> Result<Vec<FuelInput>, StoreError> {
        Ok(self
            .tables
            .read()
            .fuels
            .iter()
            .filter(|input| input.process_id == process_id)
            .cloned()
            .collect())
    }
}
