//! # Node Configuration
//!
//! Command-line arguments (with environment fallbacks) and the validated
//! runtime configuration built from them.

use std::path::PathBuf;

use cbam_propagation::{
    ChainId, EmissionRequest, ProcessId, ProductId, PropagationConfig,
};
use clap::{Parser, Subcommand};
use thiserror::Error;

/// Shortest chain length the detector accepts.
const MIN_CHAIN_LENGTH: usize = 2;

/// CBAM emission engine
#[derive(Parser, Debug)]
#[command(name = "cbam-node")]
#[command(about = "Run CBAM emission accounting operations against a JSON dataset")]
pub struct Cli {
    /// Dataset file to load into the in-memory store
    #[arg(short, long, env = "CBAM_DATASET")]
    pub dataset: Option<PathBuf>,

    /// Write the store back to the dataset file after a successful operation
    #[arg(long, requires = "dataset")]
    pub persist: bool,

    /// Longest chain the detector may emit
    #[arg(long, env = "CBAM_MAX_CHAIN_LENGTH")]
    pub max_chain_length: Option<usize>,

    /// Maximum processes in one graph propagation
    #[arg(long, env = "CBAM_MAX_GRAPH_NODES")]
    pub max_graph_nodes: Option<usize>,

    /// Maximum `continue` edges in one graph propagation
    #[arg(long, env = "CBAM_MAX_EDGE_COUNT")]
    pub max_edge_count: Option<usize>,

    /// Print Prometheus metrics after the response
    #[arg(long)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// One accounting operation.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Recompute direct emissions of a process from its inputs
    Attribute { process_id: i64 },
    /// Propagate cumulative emission from one process to another
    PropagatePoint { source_id: i64, target_id: i64 },
    /// Propagate along a registered chain
    PropagateChain { chain_id: i64 },
    /// Propagate over the `continue` graph (all of it without --root)
    PropagateGraph {
        #[arg(long = "root")]
        roots: Vec<i64>,
    },
    /// List outgoing `continue` edges of a process
    ContinueEdges { process_id: i64 },
    /// Report a chain's stored emissions
    SummarizeChain { chain_id: i64 },
    /// Total emissions of a product
    AggregateProduct { product_id: i64 },
    /// Find linear chains in the `continue` graph
    DetectChains {
        #[arg(long)]
        max_chain_length: Option<usize>,
    },
    /// Replace active chains with freshly detected ones
    RegisterChains {
        #[arg(long)]
        max_chain_length: Option<usize>,
    },
}

impl Command {
    pub fn into_request(self) -> EmissionRequest {
        match self {
            Command::Attribute { process_id } => EmissionRequest::CalculateAttribution {
                process_id: ProcessId(process_id),
            },
            Command::PropagatePoint {
                source_id,
                target_id,
            } => EmissionRequest::PropagatePoint {
                source_id: ProcessId(source_id),
                target_id: ProcessId(target_id),
            },
            Command::PropagateChain { chain_id } => EmissionRequest::PropagateChain {
                chain_id: ChainId(chain_id),
            },
            Command::PropagateGraph { roots } => EmissionRequest::PropagateGraph {
                roots: (!roots.is_empty())
                    .then(|| roots.into_iter().map(ProcessId).collect()),
            },
            Command::ContinueEdges { process_id } => EmissionRequest::GetContinueEdges {
                process_id: ProcessId(process_id),
            },
            Command::SummarizeChain { chain_id } => EmissionRequest::SummarizeChain {
                chain_id: ChainId(chain_id),
            },
            Command::AggregateProduct { product_id } => EmissionRequest::AggregateProduct {
                product_id: ProductId(product_id),
            },
            Command::DetectChains { max_chain_length } => {
                EmissionRequest::DetectChains { max_chain_length }
            }
            Command::RegisterChains { max_chain_length } => {
                EmissionRequest::RegisterDetectedChains { max_chain_length }
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be at least {min}, got {value}")]
    TooSmall {
        name: &'static str,
        value: usize,
        min: usize,
    },
}

/// Validated node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Dataset file, if any; an empty store otherwise.
    pub dataset: Option<PathBuf>,
    /// Write the store back after a successful operation.
    pub persist: bool,
    /// Engine limits.
    pub propagation: PropagationConfig,
    /// Print metrics after the response.
    pub print_metrics: bool,
}

impl NodeConfig {
    /// Apply CLI (and environment) overrides on top of the defaults.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut propagation = PropagationConfig::default();

        if let Some(value) = cli.max_chain_length {
            check_min("max_chain_length", value, MIN_CHAIN_LENGTH)?;
            propagation.max_chain_length = value;
        }
        if let Some(value) = cli.max_graph_nodes {
            check_min("max_graph_nodes", value, 1)?;
            propagation.max_graph_nodes = value;
        }
        if let Some(value) = cli.max_edge_count {
            check_min("max_edge_count", value, 1)?;
            propagation.max_edge_count = value;
        }

        Ok(Self {
            dataset: cli.dataset.clone(),
            persist: cli.persist,
            propagation,
            print_metrics: cli.metrics,
        })
    }
}

fn check_min(name: &'static str, value: usize, min: usize) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::TooSmall { name, value, min });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cbam-node").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let cli = parse(&["propagate-chain", "1"]);
        let config = NodeConfig::from_cli(&cli).unwrap();

        assert_eq!(config.propagation.max_chain_length, 10);
        assert!(!config.print_metrics);
        assert!(!config.persist);
    }

    #[test]
    fn test_limit_overrides() {
        let cli = parse(&[
            "--max-chain-length",
            "4",
            "--max-graph-nodes",
            "20",
            "detect-chains",
        ]);
        let config = NodeConfig::from_cli(&cli).unwrap();

        assert_eq!(config.propagation.max_chain_length, 4);
        assert_eq!(config.propagation.max_graph_nodes, 20);
    }

    #[test]
    fn test_chain_length_below_minimum_rejected() {
        let cli = parse(&["--max-chain-length", "1", "detect-chains"]);

        assert_eq!(
            NodeConfig::from_cli(&cli).unwrap_err(),
            ConfigError::TooSmall {
                name: "max_chain_length",
                value: 1,
                min: 2
            }
        );
    }

    #[test]
    fn test_persist_requires_dataset() {
        let result = Cli::try_parse_from(["cbam-node", "--persist", "attribute", "1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_graph_roots_map_to_scope() {
        let all = parse(&["propagate-graph"]).command.into_request();
        assert_eq!(all, EmissionRequest::PropagateGraph { roots: None });

        let rooted = parse(&["propagate-graph", "--root", "1", "--root", "4"])
            .command
            .into_request();
        assert_eq!(
            rooted,
            EmissionRequest::PropagateGraph {
                roots: Some(vec![ProcessId(1), ProcessId(4)])
            }
        );
    }

    #[test]
    fn test_subcommand_maps_to_request() {
        let request = parse(&["propagate-point", "1", "2"]).command.into_request();
        assert_eq!(
            request,
            EmissionRequest::PropagatePoint {
                source_id: ProcessId(1),
                target_id: ProcessId(2)
            }
        );
    }
}
