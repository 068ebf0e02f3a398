//! Consensus engine and related abstractions.
//!
//! This module provides the phased, tick-driven consensus layer:
//!
//! - configuration parameters ([`config::ConsensusConfig`]),
//! - round state and positions ([`round`]),
//! - the engine itself ([`engine::ConsensusEngine`]),
//! - error types ([`error::ConsensusError`]).

pub mod config;
pub mod engine;
pub mod error;
pub mod round;

pub use config::ConsensusConfig;
pub use engine::{ConsensusEngine, EngineStats, TickOutcome};
pub use error::ConsensusError;
pub use round::{ConsensusRound, Phase, Proposal, TxSet, ValidatorId};
