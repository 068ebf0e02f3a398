//! Gateway configuration.
//!
//! For now this only configures the HTTP listen address. The underlying
//! node configuration is taken from `ledger::NodeConfig::default()`.

use std::net::SocketAddr;

/// Configuration for the JSON-RPC HTTP server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP server to.
    pub listen_addr: SocketAddr,
    /// Seconds between consensus rounds driven by the background loop.
    pub round_interval_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        // Safe to unwrap: fixed, valid address literal. 5005 is the
        // conventional JSON-RPC port for XRPL-style nodes.
        let addr: SocketAddr = "0.0.0.0:5005"
            .parse()
            .expect("hard-coded API listen address should parse");
        Self {
            listen_addr: addr,
            round_interval_secs: 5,
        }
    }
}
