//! # Request Dispatch
//!
//! Runs one request through the handler and records its outcome in the
//! Prometheus registry.

use cbam_propagation::{
    EmissionRequest, EmissionResponsePayload, PropagationStep, RequestEnvelope, ResponseEnvelope,
};
use cbam_telemetry::{
    metric_inc, record_failure, HistogramTimer, ATTRIBUTIONS_CALCULATED, CHAIN_PROPAGATIONS,
    GRAPH_PROPAGATIONS, GRAPH_SIZE, PROPAGATION_STEPS,
};
use anyhow::Result;
use tracing::{debug, warn};

use crate::container::NodeContainer;

/// Handle one request end to end.
pub async fn dispatch(container: &NodeContainer, request: EmissionRequest) -> ResponseEnvelope {
    let operation = request.operation();
    let envelope = RequestEnvelope::new(request);
    debug!(correlation_id = %envelope.correlation_id, %operation, "Dispatching request");

    let timer = HistogramTimer::for_operation(operation.as_str());
    let response = container.handler.handle(envelope).await;
    timer.observe();

    record_outcome(&response);
    response
}

/// Dispatch, then persist the store whether or not the request succeeded.
///
/// A propagation that fails midway keeps its committed steps, so the
/// dataset file must see them too.
pub async fn dispatch_and_persist(
    container: &NodeContainer,
    request: EmissionRequest,
) -> Result<ResponseEnvelope> {
    let response = dispatch(container, request).await;
    if !response.success {
        warn!(
            correlation_id = %response.correlation_id,
            "Request failed, persisting any steps committed before the failure"
        );
    }
    container.persist()?;
    Ok(response)
}

/// Update counters from a response.
pub fn record_outcome(response: &ResponseEnvelope) {
    if let Some(error) = &response.error {
        record_failure(error.operation.as_str(), error.kind.as_str());
        return;
    }

    match &response.payload {
        Some(EmissionResponsePayload::Attribution(_)) => {
            metric_inc!(ATTRIBUTIONS_CALCULATED);
        }
        Some(EmissionResponsePayload::ChainPropagation(result)) => {
            metric_inc!(CHAIN_PROPAGATIONS);
            count_steps(&result.steps);
        }
        Some(EmissionResponsePayload::GraphPropagation(result)) => {
            metric_inc!(GRAPH_PROPAGATIONS);
            GRAPH_SIZE.observe(result.total_processes as f64);
            count_steps(&result.steps);
        }
        _ => {}
    }
}

fn count_steps(steps: &[PropagationStep]) {
    for step in steps {
        metric_inc!(PROPAGATION_STEPS, step.propagation_type.as_str());
    }
}
