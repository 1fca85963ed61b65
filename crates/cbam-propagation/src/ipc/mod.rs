//! Request/response layer for emission accounting
//!
//! Serde payloads with correlation ids and a handler that enforces request
//! limits before delegating to the accounting API.

pub mod handler;
pub mod payloads;

pub use handler::EmissionRequestHandler;
pub use payloads::*;
