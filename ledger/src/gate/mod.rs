//! Gate/evidence layer: deterministic checkers over pinned artifacts.
//!
//! A gate run validates an artifact directory produced by the simulation
//! harness: fixture SHA pins, artifact schema shapes, crypto evidence
//! floors, the cross-artifact simulation envelope, and a structural
//! invariant probe of the engine itself. Each gate yields a PASS/FAIL
//! report with a single-line reason; the runner enforces a wall-clock
//! ceiling and writes a machine-readable aggregate report.
//!
//! Gates never mutate engine state: a failure terminates the gate run
//! and nothing else.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::sim::artifact::{MATRIX_SUMMARY, QUEUE_DIAGNOSTICS, QUEUE_SUMMARY, SIMULATION_SUMMARY};
use crate::sim::queue::QueueDiagnostics;
use crate::sim::{ClusterSummary, MatrixSummary, QueueSummary};

pub mod envelope;
pub mod evidence;
pub mod manifest;
pub mod probe;
pub mod report;
pub mod schema;

pub use envelope::ClusterFloor;
pub use evidence::{CRYPTO_EVIDENCE, CryptoEvidence};
pub use manifest::{FIXTURE_MANIFEST, FixtureManifest};
pub use report::{GateReport, GateRunReport, GateStatus};

/// Infrastructure errors from the gate layer (reading/writing fixtures).
/// Check failures are not errors; they become FAIL reports.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("gate io: {0}")]
    Io(#[from] std::io::Error),
    #[error("gate encoding: {0}")]
    Json(#[from] serde_json::Error),
}

/// Inputs of a gate run.
#[derive(Clone, Debug)]
pub struct GateContext {
    /// Directory holding the artifacts and the fixture manifest.
    pub artifact_dir: PathBuf,
    /// Whether the crypto gate requires negative vectors.
    pub strict: bool,
    /// Wall-clock budget for the whole run.
    pub ceiling: Duration,
}

impl GateContext {
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
            strict: true,
            ceiling: Duration::from_secs(30),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let body = std::fs::read(path)
        .map_err(|e| format!("{} unreadable: {e}", path.display()))?;
    serde_json::from_slice(&body).map_err(|e| format!("{} malformed: {e}", path.display()))
}

/// Runs every gate over `ctx.artifact_dir` and writes the aggregate
/// report alongside the artifacts.
pub fn run_gates(ctx: &GateContext) -> Result<GateRunReport, GateError> {
    let started = Instant::now();
    let dir = ctx.artifact_dir.as_path();
    let mut gates = Vec::new();

    let mut tripped = false;
    let mut over_budget = |gates: &mut Vec<GateReport>| {
        if tripped {
            return true;
        }
        if started.elapsed() > ctx.ceiling {
            tripped = true;
            gates.push(GateReport::fail(
                "runner",
                format!("gate runner exceeded {}s ceiling", ctx.ceiling.as_secs()),
            ));
        }
        tripped
    };

    // Fixture pins first: everything downstream trusts these bytes.
    gates.push(match manifest::read_manifest(dir) {
        Ok(pinned) => match manifest::verify(&pinned, dir) {
            Ok(()) => GateReport::pass("fixture-manifest"),
            Err(reason) => GateReport::fail("fixture-manifest", reason),
        },
        Err(e) => GateReport::fail("fixture-manifest", format!("manifest unreadable: {e}")),
    });

    let cluster: Result<ClusterSummary, String> = read_json(&dir.join(SIMULATION_SUMMARY));
    let queue: Result<QueueSummary, String> = read_json(&dir.join(QUEUE_SUMMARY));
    let matrix: Result<MatrixSummary, String> = read_json(&dir.join(MATRIX_SUMMARY));

    if !over_budget(&mut gates) {
        gates.push(check_schemas(&cluster, &queue, &matrix));
    }

    if !over_budget(&mut gates) {
        let evidence: Result<CryptoEvidence, String> = read_json(&dir.join(CRYPTO_EVIDENCE));
        gates.push(match evidence {
            Ok(ev) => match evidence::check(&ev, ctx.strict) {
                Ok(()) => GateReport::pass("crypto-evidence"),
                Err(reason) => GateReport::fail("crypto-evidence", reason),
            },
            Err(reason) => GateReport::fail("crypto-evidence", reason),
        });
    }

    if !over_budget(&mut gates) {
        gates.push(match (&cluster, &queue, &matrix) {
            (Ok(c), Ok(q), Ok(m)) => {
                match envelope::check(c, q, m, &ClusterFloor::default()) {
                    Ok(()) => GateReport::pass("sim-envelope"),
                    Err(reason) => GateReport::fail("sim-envelope", reason),
                }
            }
            _ => GateReport::fail("sim-envelope", "summary artifacts unreadable"),
        });
    }

    if !over_budget(&mut gates) {
        let diagnostics: Result<QueueDiagnostics, String> =
            read_json(&dir.join(QUEUE_DIAGNOSTICS));
        gates.push(match (&queue, &diagnostics) {
            (Ok(summary), Ok(diag)) => match envelope::check_trend(summary, diag) {
                Ok(()) => GateReport::pass("trend-aggregation"),
                Err(reason) => GateReport::fail("trend-aggregation", reason),
            },
            _ => GateReport::fail("trend-aggregation", "queue artifacts unreadable"),
        });
    }

    if !over_budget(&mut gates) {
        gates.push(match probe::run() {
            Ok(()) => GateReport::pass("invariant-probe"),
            Err(reason) => GateReport::fail("invariant-probe", reason),
        });
    }

    let run_report = GateRunReport::from_gates(gates);
    run_report.write(dir)?;
    Ok(run_report)
}

fn check_one_schema<T: serde::Serialize>(
    name: &str,
    parsed: &Result<T, String>,
    pinned: &serde_json::Value,
) -> Result<(), String> {
    let summary = parsed.as_ref().map_err(|e| format!("{name}: {e}"))?;
    let value = serde_json::to_value(summary).map_err(|e| format!("{name}: {e}"))?;
    schema::check_shape(pinned, &value, "").map_err(|e| format!("{name}: {e}"))
}

fn check_schemas(
    cluster: &Result<ClusterSummary, String>,
    queue: &Result<QueueSummary, String>,
    matrix: &Result<MatrixSummary, String>,
) -> GateReport {
    let outcome = check_one_schema(SIMULATION_SUMMARY, cluster, &schema::cluster_summary_schema())
        .and_then(|()| check_one_schema(QUEUE_SUMMARY, queue, &schema::queue_summary_schema()))
        .and_then(|()| check_one_schema(MATRIX_SUMMARY, matrix, &schema::matrix_summary_schema()));

    match outcome {
        Ok(()) => GateReport::pass("artifact-schema"),
        Err(reason) => GateReport::fail("artifact-schema", reason),
    }
}
