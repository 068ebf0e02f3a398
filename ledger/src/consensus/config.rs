//! Consensus configuration parameters.

use serde::{Deserialize, Serialize};

/// Tuning parameters for a consensus round.
///
/// Every run of the engine receives its own copy; the engine holds no
/// process-wide mutable state. Thresholds are integer percentages and are
/// always evaluated as `supporters * 100 >= pct * active_validators` so
/// no floating point enters consensus arithmetic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Agreement percentage required to accept a round.
    pub final_threshold_pct: u32,
    /// Ticks spent collecting proposals before establishing.
    pub open_phase_ticks: u32,
    /// Wall-time bound on the open phase, in milliseconds.
    pub open_phase_ms: u32,
    /// Tick bound on the establish phase.
    pub establish_phase_ticks: u32,
    /// Establish ticks between +5% raises of the support threshold.
    pub consensus_round_ticks: u32,
    /// Hard bound on total ticks per round before the round stalls.
    pub max_iterations: u32,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            final_threshold_pct: 80,
            open_phase_ticks: 2,
            open_phase_ms: 2_000,
            establish_phase_ticks: 8,
            consensus_round_ticks: 2,
            max_iterations: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_within_documented_ranges() {
        let cfg = ConsensusConfig::default();

        assert_eq!(cfg.final_threshold_pct, 80);
        assert!(cfg.final_threshold_pct > 50 && cfg.final_threshold_pct <= 100);
        assert!(cfg.max_iterations >= cfg.open_phase_ticks + cfg.establish_phase_ticks);
    }

    #[test]
    fn config_roundtrips_through_json() {
        let cfg = ConsensusConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ConsensusConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
