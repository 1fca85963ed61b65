//! # Test Fixtures
//!
//! Stores, datasets and service wiring shared by the integration flows and
//! the benchmarks.

use cbam_propagation::{
    ChainId, ChainLink, Dataset, Emission, EmissionAccountingDependencies,
    EmissionAccountingService, EmissionRecord, FixedTimeSource, InMemoryCbamStore, Process,
    ProcessChain, ProcessId, PropagationConfig,
};
use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;

/// Steel route: sintering → blast furnace → BOF, plus a rolling mill fed by
/// the crude steel product.
pub const SAMPLE_DATASET: &str = include_str!("../../crates/cbam-node/data/sample.json");

pub type TestService = EmissionAccountingService<
    InMemoryCbamStore,
    InMemoryCbamStore,
    InMemoryCbamStore,
    InMemoryCbamStore,
    InMemoryCbamStore,
    FixedTimeSource,
>;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
}

pub fn em(value: &str) -> Emission {
    value.parse().unwrap()
}

pub fn sample_dataset() -> Dataset {
    serde_json::from_str(SAMPLE_DATASET).unwrap()
}

pub fn sample_store() -> InMemoryCbamStore {
    InMemoryCbamStore::from_dataset(sample_dataset()).unwrap()
}

pub fn make_service(store: &InMemoryCbamStore) -> TestService {
    make_service_with(store, PropagationConfig::default())
}

pub fn make_service_with(store: &InMemoryCbamStore, config: PropagationConfig) -> TestService {
    let deps = EmissionAccountingDependencies {
        emissions: store.clone(),
        edges: store.clone(),
        chains: store.clone(),
        catalog: store.clone(),
        inputs: store.clone(),
        time_source: FixedTimeSource(fixed_now()),
    };
    EmissionAccountingService::new(deps, config)
}

/// Process with an attributed record, all direct emission from materials.
pub fn seed_process(store: &InMemoryCbamStore, id: i64, attrdir: &str) {
    store
        .insert_process(Process::new(ProcessId(id), format!("process-{id}")))
        .unwrap();
    store.put_emission_record(EmissionRecord {
        process_id: ProcessId(id),
        total_matdir_emission: em(attrdir),
        total_fueldir_emission: Emission::ZERO,
        attrdir_em: em(attrdir),
        cumulative_emission: None,
        calculation_date: fixed_now(),
        updated_at: None,
        version: 1,
    })
    .unwrap();
}

/// Active chain from `(process, sequence_order, is_continue_edge)` triples.
pub fn seed_chain(store: &InMemoryCbamStore, chain_id: i64, links: &[(i64, i64, bool)]) {
    store
        .insert_chain(ProcessChain {
            id: ChainId(chain_id),
            name: format!("chain-{chain_id}"),
            is_active: true,
            links: links
                .iter()
                .map(|&(process, sequence_order, is_continue_edge)| ChainLink {
                    chain_id: ChainId(chain_id),
                    process_id: ProcessId(process),
                    sequence_order,
                    is_continue_edge,
                })
                .collect(),
        })
        .unwrap();
}

pub fn cumulative_of(store: &InMemoryCbamStore, id: i64) -> Option<Emission> {
    store
        .emission_record(ProcessId(id))
        .and_then(|record| record.cumulative_emission)
}

/// Random layered DAG: `layers × width` processes, each process wired to one
/// to three processes of the next layer. Ids are `layer * width + column + 1`.
pub fn layered_dag_store(layers: usize, width: usize, rng: &mut impl Rng) -> InMemoryCbamStore {
    let store = InMemoryCbamStore::new();
    let id = |layer: usize, column: usize| (layer * width + column + 1) as i64;

    for layer in 0..layers {
        for column in 0..width {
            let units = rng.gen_range(1..100);
            seed_process(&store, id(layer, column), &units.to_string());
        }
    }
    for layer in 0..layers.saturating_sub(1) {
        for column in 0..width {
            for _ in 0..rng.gen_range(1..=3) {
                let next = rng.gen_range(0..width);
                store.insert_continue_edge(
                    ProcessId(id(layer, column)),
                    ProcessId(id(layer + 1, next)),
                );
            }
        }
    }

    store
}

/// Linear chain `1 → 2 → … → length` with `continue` edges.
pub fn linear_store(length: usize) -> InMemoryCbamStore {
    let store = InMemoryCbamStore::new();
    for id in 1..=length as i64 {
        seed_process(&store, id, "1.5");
        if id > 1 {
            store.insert_continue_edge(ProcessId(id - 1), ProcessId(id));
        }
    }
    store
}
