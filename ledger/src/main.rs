// src/main.rs
//
// ledgerd: simulation and gate runner.
//
// - Runs the three deterministic scenarios (local cluster, queue
//   pressure, consensus experiment matrix) into an artifact directory.
// - Generates the crypto evidence fixture and pins everything into a
//   SHA-256 fixture manifest.
// - Runs the gate suite over the produced artifacts and exits 0 on PASS,
//   1 on FAIL with the single-line reason on stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use ledger::gate::{self, GateContext, evidence};
use ledger::sim::{
    ClusterConfig, MatrixConfig, QueueConfig, QueueEnvelope, SimError, artifact, cluster, matrix,
    queue,
};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ledgerd=info,ledger=info".to_string()),
        )
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("fatal error: {err}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Output directory: first argument, LEDGERD_OUT, or ./artifacts.
    let out_dir: PathBuf = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("LEDGERD_OUT").ok())
        .unwrap_or_else(|| "artifacts".to_string())
        .into();

    // ---------------------------
    // Scenario runs
    // ---------------------------

    let cluster_config = ClusterConfig::default();
    let cluster_run = cluster::run(&cluster_config);
    cluster::write_artifacts(&cluster_run, &out_dir)?;
    tracing::info!(
        success_rate_pct = cluster_run.summary.success_rate_pct,
        latest_ledger_seq = cluster_run.summary.latest_ledger_seq,
        "local cluster scenario complete"
    );

    let queue_config = QueueConfig::default();
    let queue_envelope = QueueEnvelope::default();
    let queue_run = queue::run(&queue_config, &queue_envelope);
    queue::write_artifacts(&queue_run, &out_dir)?;
    tracing::info!(
        status = %queue_run.summary.status,
        drop_rate_pct = queue_run.summary.drop_rate_pct,
        "queue pressure scenario complete"
    );

    let matrix_config = MatrixConfig::default();
    let matrix_summary = run_matrix(&matrix_config)?;
    matrix::write_artifacts(&matrix_summary, &out_dir)?;
    tracing::info!(
        experiments = matrix_summary.experiments_executed,
        "consensus experiment matrix complete"
    );

    // ---------------------------
    // Evidence + fixture pinning
    // ---------------------------

    let crypto_evidence = evidence::generate(&cluster_config.seed);
    artifact::write_json(&out_dir, evidence::CRYPTO_EVIDENCE, &crypto_evidence)?;

    let manifest = gate::manifest::pin_directory(&out_dir, "simulation")?;
    gate::manifest::write_manifest(&manifest, &out_dir)?;

    // ---------------------------
    // Gate suite
    // ---------------------------

    let ceiling_secs = std::env::var("LEDGERD_GATE_CEILING_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(30);
    let ctx = GateContext {
        artifact_dir: out_dir.clone(),
        strict: true,
        ceiling: Duration::from_secs(ceiling_secs),
    };
    let report = gate::run_gates(&ctx)?;

    if report.passed() {
        tracing::info!(dir = %out_dir.display(), "gates PASS");
        Ok(ExitCode::from(0))
    } else {
        eprintln!("{}", report.reason);
        Ok(ExitCode::from(1))
    }
}

fn run_matrix(config: &MatrixConfig) -> Result<ledger::sim::MatrixSummary, SimError> {
    let summary = matrix::run(config)?;
    // Determinism is part of the contract: rerun and compare.
    let rerun = matrix::run(config)?;
    if summary != rerun {
        return Err(SimError::InvalidManifest(
            "matrix rerun diverged from first run".to_string(),
        ));
    }
    Ok(summary)
}
