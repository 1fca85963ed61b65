//! # Reporting Flows
//!
//! Chain summaries, product totals and chain detection/registration after
//! propagation has run.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use cbam_propagation::{
        ChainId, EmissionAccountingApi, ErrorKind, GraphScope, InMemoryCbamStore, Operation,
        ProcessId, Product, ProductId, ProductProcess,
    };

    #[tokio::test]
    async fn test_summary_reflects_chain_propagation() {
        let store = sample_store();
        let service = make_service(&store);
        service.propagate_chain(ChainId(1)).await.unwrap();

        let summary = service.summarize_chain(ChainId(1)).await.unwrap();

        let rows: Vec<_> = summary
            .rows
            .iter()
            .map(|row| (row.sequence_order, row.process_name.as_str(), row.cumulative_emission))
            .collect();
        assert_eq!(
            rows,
            vec![
                (1, "Sintering", em("10")),
                (2, "Blast furnace", em("15")),
                (3, "Basic oxygen furnace", em("22")),
            ]
        );
        assert_eq!(summary.total_own_emissions, em("22"));
        assert_eq!(summary.total_cumulative_emissions, em("47"));
        assert_eq!(summary.total_matdir_emission, em("16"));
        assert_eq!(summary.total_fueldir_emission, em("6"));
    }

    #[tokio::test]
    async fn test_summary_before_propagation_reports_zero_cumulative() {
        let store = sample_store();

        let summary = make_service(&store)
            .summarize_chain(ChainId(1))
            .await
            .unwrap();

        assert!(summary
            .rows
            .iter()
            .all(|row| row.cumulative_emission == em("0")));
        assert_eq!(summary.total_own_emissions, em("22"));
    }

    #[tokio::test]
    async fn test_product_total_after_graph_propagation() {
        let store = sample_store();
        let service = make_service(&store);
        service.propagate_graph(GraphScope::All).await.unwrap();

        let total = service.aggregate_product(ProductId(1)).await.unwrap();

        assert_eq!(total.product_name, "Crude steel");
        assert_eq!(total.process_count, 1);
        assert_eq!(total.total_cumulative_emission, em("22"));
        assert_eq!(total.unpropagated_processes, 0);
    }

    #[tokio::test]
    async fn test_product_total_sums_processes() {
        let store = InMemoryCbamStore::new();
        seed_process(&store, 1, "12.5");
        seed_process(&store, 2, "7.5");
        store.insert_product(Product::new(ProductId(1), "clinker")).unwrap();
        for process in [1, 2] {
            store.link_product_process(ProductProcess {
                product_id: ProductId(1),
                process_id: ProcessId(process),
                consume_amount: None,
            });
        }
        let service = make_service(&store);
        service.propagate_graph(GraphScope::From(vec![ProcessId(1), ProcessId(2)]))
            .await
            .unwrap();

        let total = service.aggregate_product(ProductId(1)).await.unwrap();

        assert_eq!(total.total_cumulative_emission, em("20"));
        assert_eq!(total.total_attrdir_emission, em("20"));
    }

    #[tokio::test]
    async fn test_product_without_processes_totals_zero() {
        let store = InMemoryCbamStore::new();
        store.insert_product(Product::new(ProductId(5), "unused")).unwrap();

        let total = make_service(&store)
            .aggregate_product(ProductId(5))
            .await
            .unwrap();

        assert_eq!(total.process_count, 0);
        assert_eq!(total.total_cumulative_emission, em("0"));
    }

    #[tokio::test]
    async fn test_unpropagated_processes_are_counted() {
        let store = sample_store();

        let total = make_service(&store)
            .aggregate_product(ProductId(2))
            .await
            .unwrap();

        assert_eq!(total.process_count, 1);
        assert_eq!(total.unpropagated_processes, 1);
        assert!(!total.processes[0].calculated);
    }

    #[tokio::test]
    async fn test_detect_chains_on_sample_route() {
        let store = sample_store();

        let chains = make_service(&store).detect_chains(None).await.unwrap();

        assert_eq!(chains.len(), 1);
        assert_eq!(
            chains[0].processes,
            vec![ProcessId(1), ProcessId(2), ProcessId(3)]
        );
        assert_eq!(chains[0].name(), "chain-1-3");
    }

    #[tokio::test]
    async fn test_registered_chain_propagates_like_original() {
        let store = sample_store();
        let service = make_service(&store);

        let registration = service.register_detected_chains(None).await.unwrap();

        assert_eq!(registration.deactivated_chains, 1);
        assert_eq!(registration.chains.len(), 1);
        let new_id = registration.chains[0].chain_id;
        assert_ne!(new_id, ChainId(1));
        assert_eq!(store.active_chains().len(), 1);

        let result = service.propagate_chain(new_id).await.unwrap();
        assert_eq!(result.summary.last_process_cumulative, em("22"));
    }

    #[tokio::test]
    async fn test_detection_limit_splits_long_paths() {
        let store = linear_store(5);

        let chains = make_service(&store)
            .detect_chains(Some(3))
            .await
            .unwrap();

        assert!(chains.iter().all(|chain| chain.len() <= 3));
        assert_eq!(chains[0].processes[0], ProcessId(1));
    }

    #[tokio::test]
    async fn test_detection_rejects_too_short_limit() {
        let store = linear_store(3);

        let error = make_service(&store)
            .detect_chains(Some(1))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.operation(), Operation::DetectChains);
    }
}
