//! Metrics and instrumentation for the node.
//!
//! This module defines Prometheus-compatible counters for the consensus
//! engine and the transaction pipeline, and a small HTTP exporter that
//! serves `/metrics` in Prometheus text format.
//!
//! Typical usage in a binary:
//!
//! ```ignore
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use ledger::metrics::{MetricsRegistry, run_prometheus_http_server};
//!
//! let registry = Arc::new(MetricsRegistry::new()?);
//! let addr: SocketAddr = "127.0.0.1:9899".parse()?;
//! tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
//!
//! // Elsewhere:
//! registry.node.transactions_applied.inc();
//! ```

pub mod prometheus;

pub use prometheus::{MetricsRegistry, NodeMetrics, run_prometheus_http_server};
