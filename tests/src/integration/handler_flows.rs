//! # Handler Flows
//!
//! JSON requests through the node container: wire format, error reporting,
//! request limits and dataset persistence.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use cbam_node::{dispatch, dispatch_and_persist, load_dataset, NodeConfig, NodeContainer};
    use cbam_propagation::{
        ChainId, EmissionRequest, EmissionResponsePayload, ErrorKind, Operation, ProcessId,
        PropagationConfig, RequestEnvelope, ResponseEnvelope,
    };

    fn sample_container(config: NodeConfig) -> NodeContainer {
        NodeContainer::from_dataset(sample_dataset(), config).unwrap()
    }

    #[tokio::test]
    async fn test_json_request_roundtrip() {
        let container = sample_container(NodeConfig::default());
        let envelope: RequestEnvelope = serde_json::from_str(
            r#"{
                "correlation_id": "0b1c5a5e-6f0e-4e44-9d37-1a2b3c4d5e6f",
                "request": {"operation": "propagate_chain", "chain_id": 1}
            }"#,
        )
        .unwrap();
        let correlation_id = envelope.correlation_id;

        let response = container.handler.handle(envelope).await;
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(response.correlation_id, correlation_id);
        assert_eq!(json["success"], true);
        assert_eq!(json["payload"]["kind"], "chain_propagation");
        assert_eq!(
            json["payload"]["data"]["summary"]["last_process_cumulative"],
            "22.000000"
        );

        let decoded: ResponseEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, response);
    }

    #[tokio::test]
    async fn test_error_names_operation_and_identifier() {
        let container = sample_container(NodeConfig::default());

        let response = dispatch(
            &container,
            EmissionRequest::PropagatePoint {
                source_id: ProcessId(1),
                target_id: ProcessId(77),
            },
        )
        .await;

        assert!(!response.success);
        assert!(response.payload.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.kind, ErrorKind::NotFound);
        assert_eq!(error.operation, Operation::PropagatePoint);
        assert!(error.message.starts_with("propagate_point:"));
        assert!(error.message.contains("77"));
    }

    #[tokio::test]
    async fn test_configured_chain_limit_applies_to_requests() {
        let config = NodeConfig {
            propagation: PropagationConfig {
                max_chain_length: 3,
                ..Default::default()
            },
            ..Default::default()
        };
        let container = sample_container(config);

        let rejected = dispatch(
            &container,
            EmissionRequest::DetectChains {
                max_chain_length: Some(4),
            },
        )
        .await;
        let accepted = dispatch(
            &container,
            EmissionRequest::DetectChains {
                max_chain_length: Some(3),
            },
        )
        .await;

        assert_eq!(rejected.error.unwrap().kind, ErrorKind::Validation);
        assert!(matches!(
            accepted.payload,
            Some(EmissionResponsePayload::DetectedChains(ref chains)) if chains.len() == 1
        ));
    }

    #[tokio::test]
    async fn test_persisted_dataset_keeps_propagated_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        std::fs::write(&path, SAMPLE_DATASET).unwrap();

        let config = NodeConfig {
            dataset: Some(path.clone()),
            persist: true,
            ..Default::default()
        };
        let container = NodeContainer::new(config).unwrap();
        let response = dispatch(&container, EmissionRequest::PropagateGraph { roots: None }).await;
        assert!(response.success);
        container.persist().unwrap();

        let reloaded = load_dataset(&path).unwrap();
        let record = reloaded
            .emission_records
            .iter()
            .find(|record| record.process_id == ProcessId(3))
            .unwrap();
        assert_eq!(record.cumulative_emission, Some(em("22")));
        assert_eq!(reloaded.edges.len(), sample_dataset().edges.len());
    }

    #[tokio::test]
    async fn test_persist_is_noop_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        std::fs::write(&path, SAMPLE_DATASET).unwrap();

        let config = NodeConfig {
            dataset: Some(path.clone()),
            ..Default::default()
        };
        let container = NodeContainer::new(config).unwrap();
        dispatch(&container, EmissionRequest::PropagateGraph { roots: None }).await;
        container.persist().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE_DATASET);
    }

    #[tokio::test]
    async fn test_failed_chain_persists_committed_steps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        let mut dataset = sample_dataset();
        // Blast furnace loses its record, so the chain stops at step 2.
        dataset
            .emission_records
            .retain(|record| record.process_id != ProcessId(2));
        std::fs::write(&path, serde_json::to_string_pretty(&dataset).unwrap()).unwrap();

        let config = NodeConfig {
            dataset: Some(path.clone()),
            persist: true,
            ..Default::default()
        };
        let container = NodeContainer::new(config).unwrap();
        let response = dispatch_and_persist(
            &container,
            EmissionRequest::PropagateChain {
                chain_id: ChainId(1),
            },
        )
        .await
        .unwrap();

        assert!(!response.success);
        assert_eq!(response.error.unwrap().kind, ErrorKind::NotFound);

        let reloaded = load_dataset(&path).unwrap();
        let cumulative = |id: i64| {
            reloaded
                .emission_records
                .iter()
                .find(|record| record.process_id == ProcessId(id))
                .and_then(|record| record.cumulative_emission)
        };
        assert_eq!(cumulative(1), Some(em("10")));
        assert_eq!(cumulative(3), None);
    }
}
