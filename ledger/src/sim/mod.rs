//! Deterministic simulation harness.
//!
//! Three scenarios, each a pure function of `(seed, config)`:
//!
//! - [`cluster`]: a seeded local validator cluster producing per-node
//!   events and per-round summaries,
//! - [`queue`]: an admission-queue pressure model checked against an
//!   envelope of operational limits,
//! - [`matrix`]: a labeled experiment matrix driving the real consensus
//!   engine under different configurations.
//!
//! No wall-clock input reaches simulation math; the only entropy is the
//! hash-derived stream in [`entropy`]. Re-running a scenario with the
//! same inputs yields byte-identical artifacts.

use thiserror::Error;

pub mod artifact;
pub mod cluster;
pub mod entropy;
pub mod matrix;
pub mod queue;

pub use cluster::{ClusterConfig, ClusterRun, ClusterSummary};
pub use matrix::{ExperimentSpec, MatrixConfig, MatrixSummary};
pub use queue::{QueueConfig, QueueEnvelope, QueueRun, QueueSummary};

/// Schema version stamped into every artifact.
pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

/// Errors from the simulation harness.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("artifact io: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact encoding: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid experiment manifest: {0}")]
    InvalidManifest(String),
}
