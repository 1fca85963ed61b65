//! Request handler for emission accounting
//!
//! - Enforces request limits from configuration
//! - Delegates to the accounting API
//! - Maps outcomes into responses, echoing the correlation id

use crate::config::PropagationConfig;
use crate::domain::errors::{EmissionError, ValidationReason};
use crate::ipc::payloads::{
    EmissionRequest, EmissionResponsePayload, ErrorPayload, RequestEnvelope, ResponseEnvelope,
};
use crate::ports::inbound::EmissionAccountingApi;
use std::time::Instant;
use tracing::{error, info, warn};

/// Handler in front of an `EmissionAccountingApi` implementation.
pub struct EmissionRequestHandler<A> {
    api: A,
    config: PropagationConfig,
}

impl<A: EmissionAccountingApi> EmissionRequestHandler<A> {
    pub fn new(api: A, config: PropagationConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Handle one request. Never fails; errors travel in the response.
    pub async fn handle(&self, envelope: RequestEnvelope) -> ResponseEnvelope {
        let start_time = Instant::now();
        let correlation_id = envelope.correlation_id;
        let operation = envelope.request.operation();

        let outcome = match self.check_limits(&envelope.request) {
            Ok(()) => self.dispatch(envelope.request).await,
            Err(e) => {
                warn!(%correlation_id, %operation, error = %e, "Request rejected");
                Err(e)
            }
        };
        let elapsed_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(payload) => {
                info!(%correlation_id, %operation, elapsed_ms, "Request handled");
                ResponseEnvelope {
                    correlation_id,
                    success: true,
                    payload: Some(payload),
                    error: None,
                    elapsed_ms,
                }
            }
            Err(e) => {
                error!(
                    %correlation_id,
                    %operation,
                    kind = %e.kind(),
                    error = %e,
                    "Request failed"
                );
                ResponseEnvelope {
                    correlation_id,
                    success: false,
                    payload: None,
                    error: Some(ErrorPayload::from(&e)),
                    elapsed_ms,
                }
            }
        }
    }

    fn check_limits(&self, request: &EmissionRequest) -> Result<(), EmissionError> {
        let reason = match request {
            EmissionRequest::DetectChains {
                max_chain_length: Some(requested),
            }
            | EmissionRequest::RegisterDetectedChains {
                max_chain_length: Some(requested),
            } if *requested > self.config.max_chain_length => {
                ValidationReason::ChainLengthTooLong {
                    requested: *requested,
                    max: self.config.max_chain_length,
                }
            }
            EmissionRequest::PropagateGraph { roots: Some(roots) }
                if roots.len() > self.config.max_graph_nodes =>
            {
                ValidationReason::TooManyNodes {
                    count: roots.len(),
                    max: self.config.max_graph_nodes,
                }
            }
            _ => return Ok(()),
        };

        Err(EmissionError::Validation {
            operation: request.operation(),
            reason,
        })
    }

    async fn dispatch(
        &self,
        request: EmissionRequest,
    ) -> Result<EmissionResponsePayload, EmissionError> {
        let payload = match request {
            EmissionRequest::CalculateAttribution { process_id } => {
                EmissionResponsePayload::Attribution(
                    self.api.calculate_attribution(process_id).await?,
                )
            }
            EmissionRequest::PropagatePoint {
                source_id,
                target_id,
            } => EmissionResponsePayload::PointPropagation(
                self.api.propagate_point(source_id, target_id).await?,
            ),
            EmissionRequest::PropagateChain { chain_id } => {
                EmissionResponsePayload::ChainPropagation(self.api.propagate_chain(chain_id).await?)
            }
            EmissionRequest::PropagateGraph { roots } => EmissionResponsePayload::GraphPropagation(
                self.api
                    .propagate_graph(EmissionRequest::graph_scope(roots))
                    .await?,
            ),
            EmissionRequest::GetContinueEdges { process_id } => {
                EmissionResponsePayload::ContinueEdges(
                    self.api.get_continue_edges(process_id).await?,
                )
            }
            EmissionRequest::SummarizeChain { chain_id } => {
                EmissionResponsePayload::ChainSummary(self.api.summarize_chain(chain_id).await?)
            }
            EmissionRequest::AggregateProduct { product_id } => {
                EmissionResponsePayload::ProductTotal(self.api.aggregate_product(product_id).await?)
            }
            EmissionRequest::DetectChains { max_chain_length } => {
                EmissionResponsePayload::DetectedChains(
                    self.api.detect_chains(max_chain_length).await?,
                )
            }
            EmissionRequest::RegisterDetectedChains { max_chain_length } => {
                EmissionResponsePayload::ChainRegistration(
                    self.api.register_detected_chains(max_chain_length).await?,
                )
            }
        };
        Ok(payload)
    }
}
