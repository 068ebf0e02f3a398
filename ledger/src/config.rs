//! Top-level configuration for a ledger node.
//!
//! This module aggregates configuration for:
//!
//! - fee and reserve schedules (`FeeConfig`),
//! - consensus parameters (`ConsensusConfig`, defined with the engine),
//! - the agent control surface (`AgentConfig`, including the active
//!   [`Profile`]),
//! - metrics exporter (enable flag + listen address).
//!
//! The goal is a single `NodeConfig` struct that binaries can construct
//! from defaults, config files, or environment variables as needed.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consensus::ConsensusConfig;
use crate::types::{DROPS_PER_XRP, Drops};

/// Version string reported by `server_info`.
pub const BUILD_VERSION: &str = concat!("ledgerd-", env!("CARGO_PKG_VERSION"));

/// Operating profile of the control plane.
///
/// `Research` permits every RPC method; `Production` blocks mutating
/// methods and requires strict crypto.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Research,
    Production,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Research => f.write_str("research"),
            Profile::Production => f.write_str("production"),
        }
    }
}

impl FromStr for Profile {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "research" => Ok(Profile::Research),
            "production" => Ok(Profile::Production),
            _ => Err(()),
        }
    }
}

/// Fee and reserve schedule.
#[derive(Clone, Copy, Debug)]
pub struct FeeConfig {
    /// Minimum fee a transaction must carry, in drops.
    pub base_fee: Drops,
    /// Reserve every account must keep, in drops.
    pub base_reserve: Drops,
    /// Additional reserve per owned object, in drops.
    pub owner_reserve: Drops,
}

impl FeeConfig {
    /// Reserve requirement for an account owning `owner_count` objects.
    pub fn reserve(&self, owner_count: u32) -> Drops {
        let owned = self.owner_reserve.0.saturating_mul(u64::from(owner_count));
        Drops(self.base_reserve.0.saturating_add(owned))
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            base_fee: Drops(10),
            base_reserve: Drops(10 * DROPS_PER_XRP),
            owner_reserve: Drops(2 * DROPS_PER_XRP),
        }
    }
}

/// Mutable agent-control settings, surfaced via `agent_config_get`/`set`.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Active control-plane profile.
    pub profile: Profile,
    /// Advertised peer budget.
    pub max_peers: u32,
    /// Multiplier applied to the base fee to produce the median fee.
    pub fee_multiplier: u32,
    /// Whether signature suites outside the default set are rejected.
    pub strict_crypto_required: bool,
    /// Whether validator-list updates are accepted.
    pub allow_unl_updates: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Research,
            max_peers: 10,
            fee_multiplier: 2,
            strict_crypto_required: false,
            allow_unl_updates: false,
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        // Safe to unwrap: this is a fixed, valid address literal.
        let addr: SocketAddr = "127.0.0.1:9899"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Top-level configuration for a ledger node.
#[derive(Clone, Debug, Default)]
pub struct NodeConfig {
    pub consensus: ConsensusConfig,
    pub fees: FeeConfig,
    pub agent: AgentConfig,
    pub metrics: MetricsConfig,
    /// Network identifier echoed by `server_info`.
    pub network_id: u32,
}
