//! Shared application state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use ledger::{MetricsRegistry, Node};

/// State held by the HTTP handlers.
///
/// The node sits behind a [`Mutex`]: each RPC call takes exclusive
/// access for its full duration, so concurrent requests serialize and
/// every read observes a consistent snapshot.
pub struct AppState {
    /// The embedded node (ledger manager + consensus engine + config).
    pub node: Mutex<Node>,
    /// Metrics registry shared with the exporter task.
    pub metrics: Arc<MetricsRegistry>,
    /// Process start, used to feed the node's uptime.
    pub started: Instant,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
