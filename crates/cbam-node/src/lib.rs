//! # CBAM Node
//!
//! Runtime around the emission engine: configuration, service wiring and
//! request dispatch with metrics.
//!
//! - `config/` - CLI arguments, environment fallbacks and validation
//! - `container/` - In-memory store seeded from a dataset, service and handler
//! - `dispatch/` - One request through the handler, outcome recorded as metrics

pub mod config;
pub mod container;
pub mod dispatch;

pub use config::{Cli, Command, ConfigError, NodeConfig};
pub use container::{load_dataset, NodeContainer, NodeService};
pub use dispatch::{dispatch, dispatch_and_persist, record_outcome};
