//! JSON-RPC endpoint.
//!
//! `POST /` takes a single JSON object with `method` and optional
//! `params`, runs it through the core dispatcher under the node lock,
//! and returns the dispatcher's response verbatim. Method-level errors
//! (unknown method, invalid params, policy blocks) come back as normal
//! `200` responses with `result.status = "error"`, matching the
//! reference protocol.

use std::time::Instant;

use axum::{Json, extract::State};
use serde_json::Value;

use crate::state::SharedState;

/// `POST /`
///
/// Dispatches one JSON-RPC request against the embedded node.
pub async fn rpc(State(state): State<SharedState>, Json(request): Json<Value>) -> Json<Value> {
    let started = Instant::now();

    let response = {
        let mut node = state.node.lock().await;
        node.uptime_secs = state.started.elapsed().as_secs();
        ledger::dispatch(&mut node, &request)
    };

    record_metrics(&state, &request, &response, started);
    Json(response)
}

/// Mirrors dispatch outcomes into the Prometheus counters.
fn record_metrics(state: &SharedState, request: &Value, response: &Value, started: Instant) {
    let metrics = &state.metrics.node;
    metrics
        .rpc_dispatch_seconds
        .observe(started.elapsed().as_secs_f64());

    if request.get("method").and_then(Value::as_str) != Some("submit") {
        return;
    }
    match response["result"]["engine_result"].as_str() {
        Some("tesSUCCESS") => metrics.transactions_applied.inc(),
        _ => metrics.transactions_rejected.inc(),
    }
}
