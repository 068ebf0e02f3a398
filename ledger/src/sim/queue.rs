//! Queue-pressure scenario.
//!
//! Models an admission queue under bursty arrivals: capacity `Q`, drain
//! rate `D` per round, burst size `B`. Arrivals, drops, depth, and
//! latency all derive from the per-round entropy word, and the run is
//! graded against a manifest-declared [`QueueEnvelope`]. On a breach the
//! diagnostics name the first offending round and metric as root cause.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::artifact::{self, QUEUE_DIAGNOSTICS, QUEUE_SUMMARY};
use super::entropy::entropy_word;
use super::{ARTIFACT_SCHEMA_VERSION, SimError};

/// Inputs of a queue-pressure run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueConfig {
    pub seed: String,
    pub rounds: u32,
    /// Burst size `B`: the nominal arrivals per round.
    pub burst: u64,
    /// Queue capacity `Q`.
    pub capacity: u64,
    /// Drain rate `D` per round, before jitter.
    pub drain_rate: u64,
    pub base_latency_ms: u64,
    pub jitter_ms: u64,
    pub retry_penalty_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            seed: "xrpl-agent-lab-v1".to_string(),
            rounds: 30,
            burst: 100,
            capacity: 180,
            drain_rate: 130,
            base_latency_ms: 80,
            jitter_ms: 40,
            retry_penalty_ms: 100,
        }
    }
}

/// Operational limits a run must satisfy to pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEnvelope {
    pub max_drop_rate_pct: u64,
    pub max_peak_queue_depth: u64,
    pub max_avg_latency_ms: u64,
}

impl Default for QueueEnvelope {
    fn default() -> Self {
        Self {
            max_drop_rate_pct: 45,
            max_peak_queue_depth: 95,
            max_avg_latency_ms: 140,
        }
    }
}

/// One simulated round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRound {
    pub round: u32,
    pub arrivals: u64,
    pub admitted: u64,
    pub dropped: u64,
    pub depth: u64,
    pub latency_ms: u64,
    pub success: bool,
}

/// First envelope breach, reported as root cause.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breach {
    pub round: u32,
    pub metric: String,
    pub value: u64,
    pub limit: u64,
}

/// Whole-run summary, written to `queue-pressure-summary.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSummary {
    pub schema_version: u32,
    pub scenario: String,
    pub seed: String,
    pub deterministic: bool,
    pub rounds: u32,
    pub burst: u64,
    pub capacity: u64,
    pub drain_rate: u64,
    pub total_arrivals: u64,
    pub total_dropped: u64,
    pub drop_rate_pct: u64,
    pub peak_queue_depth: u64,
    pub avg_latency_ms: u64,
    pub successful_rounds: u32,
    pub status: String,
    pub envelope: QueueEnvelope,
}

/// Per-round diagnostics, written to `queue-pressure-diagnostics.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDiagnostics {
    pub schema_version: u32,
    pub scenario: String,
    pub seed: String,
    pub deterministic: bool,
    pub status: String,
    pub root_cause: Option<Breach>,
    pub rounds: Vec<QueueRound>,
}

/// Full output of a queue-pressure run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueRun {
    pub summary: QueueSummary,
    pub diagnostics: QueueDiagnostics,
}

/// Runs the scenario against an envelope. Pure in `(config, envelope)`.
pub fn run(config: &QueueConfig, envelope: &QueueEnvelope) -> QueueRun {
    let jitter = config.jitter_ms.max(1);
    let mut rounds = Vec::with_capacity(config.rounds as usize);

    let mut depth = 0u64;
    let mut total_arrivals = 0u64;
    let mut total_dropped = 0u64;
    let mut latency_total = 0u64;
    let mut peak_depth = 0u64;
    let mut successful_rounds = 0u32;

    for round in 1..=config.rounds {
        let v = u64::from(entropy_word(&config.seed, round, 0));

        let mut arrivals = config.burst * (100 + (v % 70)) / 100;
        if round % 5 == 0 {
            arrivals += config.burst / 2;
        }

        let admitted = arrivals.min(config.capacity.saturating_sub(depth));
        let dropped = arrivals - admitted;

        // Drain applies to the post-admission depth: work admitted this
        // round is drainable within the same round.
        let effective_drain = config.drain_rate.saturating_sub(v % 11);
        let drained = effective_drain.min(depth + admitted);
        depth = depth + admitted - drained;
        peak_depth = peak_depth.max(depth);

        let latency_ms = config.base_latency_ms
            + (v % jitter)
            + depth / 5
            + dropped * config.retry_penalty_ms / (config.burst + 1);

        let success = dropped <= arrivals / 2;
        if success {
            successful_rounds += 1;
        }

        total_arrivals += arrivals;
        total_dropped += dropped;
        latency_total += latency_ms;

        rounds.push(QueueRound {
            round,
            arrivals,
            admitted,
            dropped,
            depth,
            latency_ms,
            success,
        });
    }

    let drop_rate_pct = if total_arrivals == 0 {
        0
    } else {
        total_dropped * 100 / total_arrivals
    };
    let avg_latency_ms = if config.rounds == 0 {
        0
    } else {
        latency_total / u64::from(config.rounds)
    };

    let pass = drop_rate_pct <= envelope.max_drop_rate_pct
        && peak_depth <= envelope.max_peak_queue_depth
        && avg_latency_ms <= envelope.max_avg_latency_ms;
    let status = if pass { "pass" } else { "fail" };

    let root_cause = if pass {
        None
    } else {
        find_root_cause(
            &rounds,
            envelope,
            drop_rate_pct,
            peak_depth,
            avg_latency_ms,
        )
    };

    let summary = QueueSummary {
        schema_version: ARTIFACT_SCHEMA_VERSION,
        scenario: "queue-pressure".to_string(),
        seed: config.seed.clone(),
        deterministic: true,
        rounds: config.rounds,
        burst: config.burst,
        capacity: config.capacity,
        drain_rate: config.drain_rate,
        total_arrivals,
        total_dropped,
        drop_rate_pct,
        peak_queue_depth: peak_depth,
        avg_latency_ms,
        successful_rounds,
        status: status.to_string(),
        envelope: *envelope,
    };

    let diagnostics = QueueDiagnostics {
        schema_version: ARTIFACT_SCHEMA_VERSION,
        scenario: "queue-pressure".to_string(),
        seed: config.seed.clone(),
        deterministic: true,
        status: status.to_string(),
        root_cause,
        rounds,
    };

    QueueRun {
        summary,
        diagnostics,
    }
}

/// Locates the first offending `(round, metric)` for a failed run.
///
/// Breached aggregate metrics are examined in a fixed order; within the
/// chosen metric the first round whose per-round value exceeds the limit
/// wins, falling back to the round with the worst value when only the
/// aggregate breaches.
fn find_root_cause(
    rounds: &[QueueRound],
    envelope: &QueueEnvelope,
    drop_rate_pct: u64,
    peak_depth: u64,
    avg_latency_ms: u64,
) -> Option<Breach> {
    if drop_rate_pct > envelope.max_drop_rate_pct {
        let offender = rounds
            .iter()
            .find(|r| r.arrivals > 0 && r.dropped * 100 / r.arrivals > envelope.max_drop_rate_pct)
            .or_else(|| rounds.iter().max_by_key(|r| r.dropped))?;
        return Some(Breach {
            round: offender.round,
            metric: "drop_rate_pct".to_string(),
            value: if offender.arrivals > 0 {
                offender.dropped * 100 / offender.arrivals
            } else {
                0
            },
            limit: envelope.max_drop_rate_pct,
        });
    }
    if peak_depth > envelope.max_peak_queue_depth {
        let offender = rounds
            .iter()
            .find(|r| r.depth > envelope.max_peak_queue_depth)?;
        return Some(Breach {
            round: offender.round,
            metric: "peak_queue_depth".to_string(),
            value: offender.depth,
            limit: envelope.max_peak_queue_depth,
        });
    }
    if avg_latency_ms > envelope.max_avg_latency_ms {
        let offender = rounds
            .iter()
            .find(|r| r.latency_ms > envelope.max_avg_latency_ms)
            .or_else(|| rounds.iter().max_by_key(|r| r.latency_ms))?;
        return Some(Breach {
            round: offender.round,
            metric: "avg_latency_ms".to_string(),
            value: offender.latency_ms,
            limit: envelope.max_avg_latency_ms,
        });
    }
    None
}

/// Writes both queue artifacts into `dir`.
pub fn write_artifacts(run: &QueueRun, dir: &Path) -> Result<(), SimError> {
    artifact::write_json(dir, QUEUE_SUMMARY, &run.summary)?;
    artifact::write_json(dir, QUEUE_DIAGNOSTICS, &run.diagnostics)?;
    Ok(())
}
