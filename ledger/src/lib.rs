//! Ledger library crate.
//!
//! This crate provides the deterministic core of an XRP-Ledger-style
//! research node:
//!
//! - strongly-typed domain primitives (`types`),
//! - the crypto kernel (`crypto`),
//! - ledger headers, account state, and the ledger manager (`ledger`),
//! - the transaction pipeline: wire codec, validation, application
//!   (`pipeline`),
//! - the phased tick-driven consensus engine (`consensus`),
//! - the seeded simulation harness (`sim`),
//! - the gate/evidence checkers (`gate`),
//! - the profile-gated JSON-RPC dispatcher (`rpc`),
//! - Prometheus-based metrics (`metrics`),
//! - and top-level node glue and configuration (`node`, `config`).
//!
//! Higher-level binaries compose these pieces: `ledgerd` runs the
//! simulation scenarios and gates, and the `rpc-gateway` crate serves
//! the dispatcher over HTTP.

pub mod config;
pub mod consensus;
pub mod crypto;
pub mod gate;
pub mod ledger;
pub mod metrics;
pub mod node;
pub mod pipeline;
pub mod rpc;
pub mod sim;
pub mod types;

// Re-export top-level configuration types.
pub use config::{AgentConfig, FeeConfig, MetricsConfig, NodeConfig, Profile};

// Re-export "core" consensus types.
pub use consensus::{
    ConsensusConfig, ConsensusEngine, ConsensusError, ConsensusRound, EngineStats, Phase, Proposal,
    TickOutcome, TxSet, ValidatorId,
};

// Re-export ledger and pipeline entry points.
pub use ledger::{AccountState, Ledger, LedgerManager};
pub use pipeline::{EngineResult, PipelineError, Receipt, Transaction, TxPayload, TxType};

// Re-export the node glue and RPC dispatcher.
pub use node::{Node, SubmitError};
pub use rpc::dispatch;

// Re-export metrics registry and exporter.
pub use metrics::{MetricsRegistry, NodeMetrics, run_prometheus_http_server};

// Re-export domain types at the crate root for convenience.
pub use types::*;
