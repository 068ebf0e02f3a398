//! Prometheus-backed metrics and HTTP exporter.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};

/// Node-level Prometheus metrics.
///
/// Registered into a [`Registry`]. The RPC surface feeds the dispatch
/// and transaction counters; the gateway's round-driver loop mirrors
/// the engine's [`EngineStats`](crate::consensus::EngineStats) into the
/// consensus counters after every round.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Transactions that applied with `tesSUCCESS`.
    pub transactions_applied: IntCounter,
    /// Transactions rejected by decode, validation, or application.
    pub transactions_rejected: IntCounter,
    /// Consensus rounds that reached Accept.
    pub rounds_accepted: IntCounter,
    /// Consensus rounds discarded after exhausting `max_iterations`.
    pub rounds_stalled: IntCounter,
    /// Proposal blobs dropped because they failed to decode.
    pub proposals_dropped: IntCounter,
    /// Latency of a full RPC dispatch, in seconds.
    pub rpc_dispatch_seconds: Histogram,
}

impl NodeMetrics {
    /// Registers node metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let transactions_applied = IntCounter::with_opts(Opts::new(
            "pipeline_transactions_applied",
            "Total transactions applied with tesSUCCESS",
        ))?;
        registry.register(Box::new(transactions_applied.clone()))?;

        let transactions_rejected = IntCounter::with_opts(Opts::new(
            "pipeline_transactions_rejected",
            "Total transactions rejected at decode, validation, or application",
        ))?;
        registry.register(Box::new(transactions_rejected.clone()))?;

        let rounds_accepted = IntCounter::with_opts(Opts::new(
            "consensus_rounds_accepted",
            "Total consensus rounds that reached Accept",
        ))?;
        registry.register(Box::new(rounds_accepted.clone()))?;

        let rounds_stalled = IntCounter::with_opts(Opts::new(
            "consensus_rounds_stalled",
            "Total consensus rounds discarded after max_iterations",
        ))?;
        registry.register(Box::new(rounds_stalled.clone()))?;

        let proposals_dropped = IntCounter::with_opts(Opts::new(
            "consensus_proposals_dropped",
            "Total proposal blobs dropped as undecodable",
        ))?;
        registry.register(Box::new(proposals_dropped.clone()))?;

        let rpc_dispatch_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "rpc_dispatch_seconds",
                "Time to dispatch one RPC request in seconds",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(rpc_dispatch_seconds.clone()))?;

        Ok(Self {
            transactions_applied,
            transactions_rejected,
            rounds_accepted,
            rounds_stalled,
            proposals_dropped,
            rpc_dispatch_seconds,
        })
    }
}

/// Wrapper around a Prometheus registry and the node metrics.
///
/// This is the main handle passed around the node; wrap it in an
/// [`Arc`] to share across tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub node: NodeMetrics,
}

impl MetricsRegistry {
    /// Creates a registry with the `ledgerd` namespace and registers the
    /// node metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("ledgerd".to_string()), None)?;
        let node = NodeMetrics::register(&registry)?;
        Ok(Self { registry, node })
    }

    /// Encodes all metrics into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// Serves `GET /metrics` on `addr`; all other paths return 404. Intended
/// to be spawned onto a Tokio runtime.
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!("metrics HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn node_metrics_register_and_record() {
        let registry = Registry::new();
        let metrics = NodeMetrics::register(&registry).expect("register metrics");

        metrics.transactions_applied.inc();
        metrics.rounds_accepted.inc();
        metrics.proposals_dropped.inc();
        metrics.rpc_dispatch_seconds.observe(0.002);

        assert!(!registry.gather().is_empty());
        assert_eq!(metrics.transactions_applied.get(), 1);
    }

    #[test]
    fn metrics_registry_gathers_text() {
        let registry = MetricsRegistry::new().expect("create metrics registry");
        registry.node.transactions_applied.inc();
        let text = registry.gather_text();
        assert!(text.contains("pipeline_transactions_applied"));
    }
}
