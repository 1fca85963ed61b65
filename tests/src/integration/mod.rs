//! # Integration Flows
//!
//! End-to-end scenarios over the in-memory store: attribution, chain and
//! graph propagation, reporting, chain detection and the request handler.

pub mod handler_flows;
pub mod propagation_flows;
pub mod reporting_flows;
