//! Simulation-envelope gate.
//!
//! Validates the three scenario summaries together: every artifact must
//! declare determinism, echo the same seed (the cross-fixture
//! identifier), sit inside its declared envelope, and satisfy the matrix
//! invariants (three-plus unique labels, zero baseline deltas).

use std::collections::BTreeSet;

use crate::sim::queue::QueueDiagnostics;
use crate::sim::{ClusterSummary, MatrixSummary, QueueSummary};

/// Floors the cluster summary must meet.
#[derive(Clone, Copy, Debug)]
pub struct ClusterFloor {
    pub min_success_rate_pct: u32,
}

impl Default for ClusterFloor {
    fn default() -> Self {
        // Roughly 0.85^nodes of rounds clear the vote floor; 10% leaves
        // seed-to-seed variance plenty of headroom.
        Self {
            min_success_rate_pct: 10,
        }
    }
}

/// Cross-artifact envelope check.
pub fn check(
    cluster: &ClusterSummary,
    queue: &QueueSummary,
    matrix: &MatrixSummary,
    floor: &ClusterFloor,
) -> Result<(), String> {
    if !cluster.deterministic || !queue.deterministic || !matrix.deterministic {
        return Err("artifact does not declare deterministic:true".to_string());
    }

    if cluster.seed != queue.seed || cluster.seed != matrix.seed {
        return Err(format!(
            "cross-fixture seed mismatch: cluster={} queue={} matrix={}",
            cluster.seed, queue.seed, matrix.seed
        ));
    }

    // The queue summary must agree with its own envelope verdict.
    let within = queue.drop_rate_pct <= queue.envelope.max_drop_rate_pct
        && queue.peak_queue_depth <= queue.envelope.max_peak_queue_depth
        && queue.avg_latency_ms <= queue.envelope.max_avg_latency_ms;
    match (within, queue.status.as_str()) {
        (true, "pass") | (false, "fail") => {}
        (_, status) => {
            return Err(format!(
                "queue status '{status}' contradicts its envelope metrics"
            ));
        }
    }
    if !within {
        return Err(format!(
            "queue envelope breached: drop_rate={}% peak_depth={} avg_latency={}ms",
            queue.drop_rate_pct, queue.peak_queue_depth, queue.avg_latency_ms
        ));
    }

    if cluster.success_rate_pct < floor.min_success_rate_pct {
        return Err(format!(
            "cluster success_rate {}% below floor {}%",
            cluster.success_rate_pct, floor.min_success_rate_pct
        ));
    }
    let expected_latest = cluster.start_ledger_seq + u64::from(cluster.successful_rounds);
    if cluster.latest_ledger_seq != expected_latest {
        return Err(format!(
            "cluster latest_ledger_seq {} != start {} + successes {}",
            cluster.latest_ledger_seq, cluster.start_ledger_seq, cluster.successful_rounds
        ));
    }

    if matrix.experiments_executed < 3 {
        return Err(format!(
            "matrix executed {} experiments, need >= 3",
            matrix.experiments_executed
        ));
    }
    let labels: BTreeSet<&str> = matrix.results.iter().map(|r| r.label.as_str()).collect();
    if labels.len() != matrix.results.len() {
        return Err("matrix labels are not unique".to_string());
    }
    match matrix.deltas_vs_baseline.first() {
        Some(first) if first.ticks == 0 && first.accepted_set_size == 0 => {}
        Some(_) => return Err("baseline deltas row is not all-zero".to_string()),
        None => return Err("matrix has no deltas_vs_baseline rows".to_string()),
    }

    Ok(())
}

/// Trend aggregation: recomputes the queue summary's aggregates from
/// the per-round diagnostic series.
///
/// The summary is only trustworthy if it is a faithful aggregation of
/// the rounds it claims to summarize; any divergence between the two
/// fixtures is a hard fail.
pub fn check_trend(summary: &QueueSummary, diagnostics: &QueueDiagnostics) -> Result<(), String> {
    if diagnostics.rounds.len() != summary.rounds as usize {
        return Err(format!(
            "diagnostics carry {} rounds, summary claims {}",
            diagnostics.rounds.len(),
            summary.rounds
        ));
    }
    if diagnostics.status != summary.status || diagnostics.seed != summary.seed {
        return Err("queue summary and diagnostics disagree on status or seed".to_string());
    }

    let mut arrivals = 0u64;
    let mut dropped = 0u64;
    let mut latency_total = 0u64;
    let mut peak_depth = 0u64;
    let mut successes = 0u32;
    for round in &diagnostics.rounds {
        arrivals += round.arrivals;
        dropped += round.dropped;
        latency_total += round.latency_ms;
        peak_depth = peak_depth.max(round.depth);
        if round.success {
            successes += 1;
        }
    }

    if arrivals != summary.total_arrivals || dropped != summary.total_dropped {
        return Err(format!(
            "re-aggregated arrivals/drops {arrivals}/{dropped} != summary {}/{}",
            summary.total_arrivals, summary.total_dropped
        ));
    }
    if peak_depth != summary.peak_queue_depth {
        return Err(format!(
            "re-aggregated peak depth {peak_depth} != summary {}",
            summary.peak_queue_depth
        ));
    }
    let avg = if summary.rounds == 0 {
        0
    } else {
        latency_total / u64::from(summary.rounds)
    };
    if avg != summary.avg_latency_ms {
        return Err(format!(
            "re-aggregated avg latency {avg} != summary {}",
            summary.avg_latency_ms
        ));
    }
    if successes != summary.successful_rounds {
        return Err(format!(
            "re-aggregated successes {successes} != summary {}",
            summary.successful_rounds
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ClusterConfig, MatrixConfig, QueueConfig, QueueEnvelope, cluster, matrix, queue};

    fn fresh_artifacts() -> (ClusterSummary, QueueSummary, MatrixSummary) {
        let cluster = cluster::run(&ClusterConfig::default()).summary;
        let queue = queue::run(&QueueConfig::default(), &QueueEnvelope::default()).summary;
        let matrix = matrix::run(&MatrixConfig::default()).unwrap();
        (cluster, queue, matrix)
    }

    #[test]
    fn default_artifacts_clear_the_gate() {
        let (cluster, queue, matrix) = fresh_artifacts();
        check(&cluster, &queue, &matrix, &ClusterFloor::default()).unwrap();
    }

    #[test]
    fn seed_disagreement_is_a_hard_fail() {
        let (cluster, mut queue, matrix) = fresh_artifacts();
        queue.seed = "someone-else".to_string();

        let err = check(&cluster, &queue, &matrix, &ClusterFloor::default()).unwrap_err();
        assert!(err.contains("seed mismatch"));
    }

    #[test]
    fn non_deterministic_artifact_is_rejected() {
        let (mut cluster, queue, matrix) = fresh_artifacts();
        cluster.deterministic = false;

        let err = check(&cluster, &queue, &matrix, &ClusterFloor::default()).unwrap_err();
        assert!(err.contains("deterministic"));
    }

    #[test]
    fn contradictory_queue_status_is_rejected() {
        let (cluster, mut queue, matrix) = fresh_artifacts();
        // Force a verdict that disagrees with the metrics.
        queue.status = if queue.status == "pass" { "fail" } else { "pass" }.to_string();

        let err = check(&cluster, &queue, &matrix, &ClusterFloor::default()).unwrap_err();
        assert!(err.contains("contradicts"));
    }

    #[test]
    fn duplicate_matrix_labels_are_rejected() {
        let (cluster, queue, mut matrix) = fresh_artifacts();
        let clone = matrix.results[0].label.clone();
        matrix.results[1].label = clone;

        let err = check(&cluster, &queue, &matrix, &ClusterFloor::default()).unwrap_err();
        assert!(err.contains("not unique"));
    }

    #[test]
    fn trend_aggregation_accepts_faithful_summaries() {
        let run = queue::run(&QueueConfig::default(), &QueueEnvelope::default());
        check_trend(&run.summary, &run.diagnostics).unwrap();
    }

    #[test]
    fn trend_aggregation_catches_doctored_totals() {
        let mut run = queue::run(&QueueConfig::default(), &QueueEnvelope::default());
        run.summary.total_dropped += 1;

        let err = check_trend(&run.summary, &run.diagnostics).unwrap_err();
        assert!(err.contains("re-aggregated arrivals/drops"));
    }

    #[test]
    fn trend_aggregation_catches_truncated_series() {
        let mut run = queue::run(&QueueConfig::default(), &QueueEnvelope::default());
        run.diagnostics.rounds.pop();

        let err = check_trend(&run.summary, &run.diagnostics).unwrap_err();
        assert!(err.contains("rounds"));
    }

    #[test]
    fn nonzero_baseline_deltas_are_rejected() {
        let (cluster, queue, mut matrix) = fresh_artifacts();
        matrix.deltas_vs_baseline[0].ticks = 1;

        let err = check(&cluster, &queue, &matrix, &ClusterFloor::default()).unwrap_err();
        assert!(err.contains("baseline deltas"));
    }
}
