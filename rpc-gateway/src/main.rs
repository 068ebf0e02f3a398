// rpc-gateway/src/main.rs

//! JSON-RPC gateway binary.
//!
//! This binary exposes the ledger node's control plane over HTTP:
//!
//! - `POST /` for JSON-RPC dispatch (`server_info`, `ledger`, `fee`,
//!   `account_info`, `submit`, agent control, ...)
//! - `GET /health`
//!
//! It embeds a [`ledger::Node`], serializes requests through a mutex,
//! runs a background round-driver loop that periodically takes a
//! consensus round to completion and closes the open ledger, and runs a
//! Prometheus metrics exporter on `/metrics`.

mod config;
mod routes;
mod state;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::signal;

use ledger::crypto::{Keypair, sha512_half};
use ledger::{
    Drops, EngineStats, MetricsRegistry, Node, NodeConfig, TickOutcome,
    run_prometheus_http_server,
};

use config::ApiConfig;
use routes::{health, rpc};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() {
    // Basic tracing setup.
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "rpc_gateway=info,ledger=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    // For now we use default configs. These can be externalised later.
    let api_cfg = ApiConfig::default();
    let node_cfg = NodeConfig::default();

    // ---------------------------
    // Metrics
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new()
            .map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if node_cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = node_cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::warn!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // Node + genesis funding
    // ---------------------------

    let mut node = Node::new(node_cfg);

    // Research convenience: fund one deterministic account so `submit`
    // can be exercised against a fresh node.
    let genesis_keys = Keypair::from_seed(sha512_half(b"rpc-gateway-genesis").as_bytes());
    let genesis_account = genesis_keys.account_id();
    node.genesis_fund(
        genesis_account,
        Drops::from_xrp(1_000).map_err(|e| format!("genesis amount overflow: {e}"))?,
    );
    tracing::info!(
        account = %genesis_account,
        public_key = %hex::encode_upper(genesis_keys.public_key()),
        "funded genesis research account"
    );

    // ---------------------------
    // Shared state
    // ---------------------------

    let app_state: SharedState = Arc::new(AppState {
        node: tokio::sync::Mutex::new(node),
        metrics: metrics.clone(),
        started: Instant::now(),
    });

    // ---------------------------
    // Round driver loop
    // ---------------------------

    let driver_state = app_state.clone();
    let round_interval_secs = api_cfg.round_interval_secs;
    tokio::spawn(async move {
        run_round_driver(driver_state, round_interval_secs).await;
    });

    // ---------------------------
    // HTTP router
    // ---------------------------

    let app = Router::new()
        .route("/", post(rpc::rpc))
        .route("/health", get(health::health))
        .with_state(app_state);

    tracing::info!("JSON-RPC gateway listening on http://{}", api_cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(api_cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", api_cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("RPC server error: {e}"))?;

    Ok(())
}

/// Background round-driver loop.
///
/// Periodically drives the embedded consensus engine through a full
/// round over the submitted transactions and seals the open ledger on
/// Accept, then mirrors the engine's counters into Prometheus.
async fn run_round_driver(state: SharedState, interval_secs: u64) {
    let interval = std::time::Duration::from_secs(interval_secs.max(1));
    tracing::info!(
        "round driver running with interval {}s",
        interval.as_secs()
    );

    loop {
        tokio::time::sleep(interval).await;

        let outcome = {
            let mut node = state.node.lock().await;
            let now_ms = state.started.elapsed().as_millis() as u64;
            let close_time = current_unix_timestamp();
            let outcome = node.run_round(now_ms, close_time);
            mirror_engine_stats(&state.metrics, node.engine.stats());
            outcome
        };

        match outcome {
            Ok(TickOutcome::Accepted(set)) => {
                tracing::info!(txs = set.len(), "round accepted, ledger closed");
            }
            Ok(TickOutcome::Aborted { round_id }) => {
                tracing::warn!(round_id, "round aborted");
            }
            Ok(TickOutcome::Stalled { round_id }) => {
                tracing::warn!(round_id, "round stalled");
            }
            Ok(TickOutcome::Pending) => {}
            Err(e) => {
                tracing::warn!("consensus round error: {e}");
            }
        }
    }
}

/// Advances the Prometheus consensus counters to match the engine's own
/// monotonic [`EngineStats`].
fn mirror_engine_stats(metrics: &MetricsRegistry, stats: EngineStats) {
    let node = &metrics.node;
    node.rounds_accepted
        .inc_by(stats.rounds_accepted.saturating_sub(node.rounds_accepted.get()));
    node.rounds_stalled
        .inc_by(stats.rounds_stalled.saturating_sub(node.rounds_stalled.get()));
    node.proposals_dropped
        .inc_by(stats.proposals_dropped.saturating_sub(node.proposals_dropped.get()));
}

/// Returns the current wall-clock time as seconds since Unix epoch.
fn current_unix_timestamp() -> u64 {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
