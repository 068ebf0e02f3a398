//! Artifact schema pins.
//!
//! A pinned schema is a JSON template whose *shape* (key sets, value
//! kinds, array element shape) an artifact must match exactly. The
//! checker walks both documents and reports the first divergent path.

use serde_json::{Value, json};

/// Compares `actual` against a pinned template, shape-wise.
///
/// Objects must carry exactly the pinned key set; arrays are checked
/// element-wise against the template's first element; scalars must agree
/// on JSON kind. The first divergence fails with its path.
pub fn check_shape(pinned: &Value, actual: &Value, path: &str) -> Result<(), String> {
    match (pinned, actual) {
        (Value::Object(p), Value::Object(a)) => {
            for key in p.keys() {
                if !a.contains_key(key) {
                    return Err(format!("SchemaMismatch: missing key {path}/{key}"));
                }
            }
            for key in a.keys() {
                if !p.contains_key(key) {
                    return Err(format!("SchemaMismatch: unexpected key {path}/{key}"));
                }
            }
            for (key, sub) in p {
                check_shape(sub, &a[key], &format!("{path}/{key}"))?;
            }
            Ok(())
        }
        (Value::Array(p), Value::Array(a)) => {
            if let Some(template) = p.first() {
                for (index, element) in a.iter().enumerate() {
                    check_shape(template, element, &format!("{path}[{index}]"))?;
                }
            }
            Ok(())
        }
        (Value::String(_), Value::String(_)) => Ok(()),
        (Value::Bool(_), Value::Bool(_)) => Ok(()),
        (Value::Number(_), Value::Number(_)) => Ok(()),
        (Value::Null, _) | (_, Value::Null) => Ok(()),
        _ => Err(format!("SchemaMismatch: wrong value kind at {path}")),
    }
}

/// Pinned shape of `simulation-summary.json`.
pub fn cluster_summary_schema() -> Value {
    json!({
        "schema_version": 1,
        "scenario": "local-cluster",
        "seed": "",
        "deterministic": true,
        "nodes": 0,
        "rounds": 0,
        "base_latency_ms": 0,
        "jitter_ms": 0,
        "successful_rounds": 0,
        "success_rate_pct": 0,
        "start_ledger_seq": 0,
        "latest_ledger_seq": 0,
        "avg_latency_ms": 0
    })
}

/// Pinned shape of `queue-pressure-summary.json`.
pub fn queue_summary_schema() -> Value {
    json!({
        "schema_version": 1,
        "scenario": "queue-pressure",
        "seed": "",
        "deterministic": true,
        "rounds": 0,
        "burst": 0,
        "capacity": 0,
        "drain_rate": 0,
        "total_arrivals": 0,
        "total_dropped": 0,
        "drop_rate_pct": 0,
        "peak_queue_depth": 0,
        "avg_latency_ms": 0,
        "successful_rounds": 0,
        "status": "",
        "envelope": {
            "max_drop_rate_pct": 0,
            "max_peak_queue_depth": 0,
            "max_avg_latency_ms": 0
        }
    })
}

/// Pinned shape of `matrix-summary.json`.
pub fn matrix_summary_schema() -> Value {
    json!({
        "schema_version": 1,
        "scenario": "consensus-matrix",
        "seed": "",
        "deterministic": true,
        "experiments_executed": 0,
        "results": [{
            "label": "",
            "accepted": true,
            "stalled": false,
            "ticks": 0,
            "accepted_set_size": 0,
            "final_threshold_pct": 0
        }],
        "deltas_vs_baseline": [{
            "label": "",
            "ticks": 0,
            "accepted_set_size": 0
        }]
    })
}
