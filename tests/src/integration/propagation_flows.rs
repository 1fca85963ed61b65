//! # Propagation Flows
//!
//! Attribution followed by chain, graph and point-to-point propagation over
//! the sample steel route and synthetic graphs.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use cbam_propagation::{
        ChainId, EmissionAccountingApi, ErrorKind, GraphScope, InMemoryCbamStore, Operation,
        ProcessId, PropagationConfig, PropagationType,
    };

    // =============================================================================
    // SAMPLE STEEL ROUTE
    // =============================================================================

    #[tokio::test]
    async fn test_sample_chain_accumulates_along_route() {
        let store = sample_store();
        let service = make_service(&store);

        let result = service.propagate_chain(ChainId(1)).await.unwrap();

        let cumulative: Vec<_> = result
            .steps
            .iter()
            .map(|step| step.cumulative_emission)
            .collect();
        assert_eq!(cumulative, vec![em("10"), em("15"), em("22")]);
        assert_eq!(result.summary.total_own_emissions, em("22"));
        assert_eq!(result.summary.total_cumulative_emissions, em("47"));
        assert_eq!(result.summary.last_process_cumulative, em("22"));
        assert_eq!(result.successful_propagations, 3);
    }

    #[tokio::test]
    async fn test_attribution_then_chain_propagation() {
        let store = sample_store();
        let service = make_service(&store);

        for id in 1..=3 {
            service.calculate_attribution(ProcessId(id)).await.unwrap();
            assert_eq!(cumulative_of(&store, id), None);
        }
        let record = store.emission_record(ProcessId(1)).unwrap();
        assert_eq!(record.total_matdir_emission, em("5"));
        assert_eq!(record.total_fueldir_emission, em("5"));
        assert_eq!(record.attrdir_em, em("10"));
        assert_eq!(record.calculation_date, fixed_now());

        service.propagate_chain(ChainId(1)).await.unwrap();

        assert_eq!(cumulative_of(&store, 3), Some(em("22")));
    }

    #[tokio::test]
    async fn test_attribution_without_inputs_is_not_found() {
        let store = sample_store();
        let service = make_service(&store);

        let error = service
            .calculate_attribution(ProcessId(4))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.operation(), Operation::CalculateAttribution);
        assert!(store.emission_record(ProcessId(4)).is_none());
    }

    #[tokio::test]
    async fn test_graph_mode_matches_chain_mode_on_linear_route() {
        let chain_store = sample_store();
        let graph_store = sample_store();

        make_service(&chain_store)
            .propagate_chain(ChainId(1))
            .await
            .unwrap();
        let result = make_service(&graph_store)
            .propagate_graph(GraphScope::All)
            .await
            .unwrap();

        for id in 1..=3 {
            assert_eq!(cumulative_of(&graph_store, id), cumulative_of(&chain_store, id));
        }
        assert_eq!(
            result.levels,
            vec![vec![ProcessId(1)], vec![ProcessId(2)], vec![ProcessId(3)]]
        );
        // Produce/consume edges never propagate.
        assert_eq!(cumulative_of(&graph_store, 4), None);
    }

    #[tokio::test]
    async fn test_graph_from_root_writes_downstream_only() {
        let store = sample_store();
        let service = make_service(&store);

        let result = service
            .propagate_graph(GraphScope::From(vec![ProcessId(2)]))
            .await
            .unwrap();

        assert_eq!(result.total_processes, 2);
        assert_eq!(result.steps[0].propagation_type, PropagationType::ContinueEdge);
        assert_eq!(result.steps[0].source_process_ids, vec![ProcessId(1)]);
        // Sintering is read for its direct emission but left unwritten.
        assert_eq!(cumulative_of(&store, 1), None);
        assert_eq!(cumulative_of(&store, 2), Some(em("15")));
        assert_eq!(cumulative_of(&store, 3), Some(em("22")));
    }

    #[tokio::test]
    async fn test_rooted_rerun_matches_full_graph() {
        let store = InMemoryCbamStore::new();
        for (id, units) in [(1, "10"), (2, "5"), (3, "7"), (4, "1")] {
            seed_process(&store, id, units);
        }
        for (from, to) in [(1, 2), (1, 3), (2, 4), (3, 4)] {
            store.insert_continue_edge(ProcessId(from), ProcessId(to));
        }
        let service = make_service(&store);
        service.propagate_graph(GraphScope::All).await.unwrap();
        assert_eq!(cumulative_of(&store, 4), Some(em("33")));

        service
            .propagate_graph(GraphScope::From(vec![ProcessId(2)]))
            .await
            .unwrap();

        assert_eq!(cumulative_of(&store, 2), Some(em("15")));
        assert_eq!(cumulative_of(&store, 4), Some(em("33")));
    }

    // =============================================================================
    // SYNTHETIC GRAPHS
    // =============================================================================

    #[tokio::test]
    async fn test_diamond_fan_in_sums_both_branches() {
        let store = InMemoryCbamStore::new();
        for (id, units) in [(1, "10"), (2, "2"), (3, "3"), (4, "1")] {
            seed_process(&store, id, units);
        }
        for (from, to) in [(1, 2), (1, 3), (2, 4), (3, 4)] {
            store.insert_continue_edge(ProcessId(from), ProcessId(to));
        }

        let result = make_service(&store)
            .propagate_graph(GraphScope::All)
            .await
            .unwrap();

        // 4 = (10 + 2) + (10 + 3) + 1
        assert_eq!(cumulative_of(&store, 4), Some(em("26")));
        let last = result.steps.last().unwrap();
        assert_eq!(last.propagation_type, PropagationType::FanIn);
        assert_eq!(last.source_process_ids, vec![ProcessId(2), ProcessId(3)]);
    }

    #[tokio::test]
    async fn test_cycle_rejected_before_any_write() {
        let store = InMemoryCbamStore::new();
        for id in 1..=3 {
            seed_process(&store, id, "1");
        }
        for (from, to) in [(1, 2), (2, 3), (3, 1)] {
            store.insert_continue_edge(ProcessId(from), ProcessId(to));
        }

        let error = make_service(&store)
            .propagate_graph(GraphScope::All)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Cycle);
        assert!(error.to_string().contains("1, 2, 3"));
        for id in 1..=3 {
            assert_eq!(cumulative_of(&store, id), None);
        }
    }

    #[tokio::test]
    async fn test_graph_over_node_limit_rejected() {
        let store = linear_store(6);
        let config = PropagationConfig {
            max_graph_nodes: 5,
            ..Default::default()
        };

        let error = make_service_with(&store, config)
            .propagate_graph(GraphScope::All)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(cumulative_of(&store, 1), None);
    }

    #[tokio::test]
    async fn test_long_linear_graph() {
        let store = linear_store(200);

        let result = make_service(&store)
            .propagate_graph(GraphScope::All)
            .await
            .unwrap();

        assert_eq!(result.levels.len(), 200);
        assert_eq!(cumulative_of(&store, 200), Some(em("300")));
    }

    #[tokio::test]
    async fn test_missing_record_midway_keeps_earlier_steps() {
        let store = InMemoryCbamStore::new();
        seed_process(&store, 1, "10");
        seed_process(&store, 3, "7");
        seed_chain(&store, 1, &[(1, 1, false), (2, 2, true), (3, 3, true)]);

        let error = make_service(&store)
            .propagate_chain(ChainId(1))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert!(error.to_string().contains(" 2 "));
        assert_eq!(cumulative_of(&store, 1), Some(em("10")));
        assert_eq!(cumulative_of(&store, 3), None);
    }

    #[tokio::test]
    async fn test_concurrent_disjoint_chains() {
        let store = InMemoryCbamStore::new();
        for (id, units) in [(1, "1"), (2, "2"), (11, "10"), (12, "20")] {
            seed_process(&store, id, units);
        }
        seed_chain(&store, 1, &[(1, 1, false), (2, 2, true)]);
        seed_chain(&store, 2, &[(11, 1, false), (12, 2, true)]);
        let service = make_service(&store);

        let (first, second) = tokio::join!(
            service.propagate_chain(ChainId(1)),
            service.propagate_chain(ChainId(2))
        );

        assert_eq!(first.unwrap().summary.last_process_cumulative, em("3"));
        assert_eq!(second.unwrap().summary.last_process_cumulative, em("30"));
    }

    #[tokio::test]
    async fn test_point_propagation_is_idempotent() {
        let store = InMemoryCbamStore::new();
        seed_process(&store, 1, "100");
        seed_process(&store, 2, "25");
        let service = make_service(&store);

        assert!(service
            .propagate_point(ProcessId(1), ProcessId(2))
            .await
            .unwrap());
        assert!(service
            .propagate_point(ProcessId(1), ProcessId(2))
            .await
            .unwrap());

        assert_eq!(cumulative_of(&store, 2), Some(em("125")));
    }
}
