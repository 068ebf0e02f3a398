//! Consensus error types.

use thiserror::Error;

/// High-level errors surfaced by the consensus engine.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConsensusError {
    /// `max_iterations` elapsed without reaching Accept. Non-fatal: the
    /// round is discarded and a fresh one can open.
    #[error("ConsensusStalled: no accept after {0} ticks")]
    Stalled(u32),
    /// Validator identity failed the well-formedness check.
    #[error("malformed validator identity")]
    MalformedValidator,
    /// An operation needed an active round and none is open.
    #[error("no active consensus round")]
    NoActiveRound,
    /// A proposal targeted a round other than the active one.
    #[error("proposal for round {got}, active round is {active}")]
    WrongRound { got: u32, active: u32 },
}
