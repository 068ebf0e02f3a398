//! Round-scoped consensus state: validators, positions, phases.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ACCOUNT_ID_LEN, Hash256};

/// Validator identity, 20 bytes like an account id.
///
/// The all-zero identity is reserved and treated as malformed.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct ValidatorId(pub [u8; ACCOUNT_ID_LEN]);

impl ValidatorId {
    pub fn is_malformed(&self) -> bool {
        self.0 == [0u8; ACCOUNT_ID_LEN]
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

/// A candidate transaction set: the hashes a validator wants in the next
/// ledger.
///
/// Backed by a `BTreeSet`, so iteration is sorted and the derived `Ord`
/// is exactly the lexicographic set ordering the tie-break rule needs:
/// when two candidate sets tie on support, `min` by this ordering wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxSet(pub BTreeSet<Hash256>);

impl TxSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_hashes<I: IntoIterator<Item = Hash256>>(hashes: I) -> Self {
        Self(hashes.into_iter().collect())
    }

    pub fn insert(&mut self, hash: Hash256) {
        self.0.insert(hash);
    }

    pub fn contains(&self, hash: &Hash256) -> bool {
        self.0.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hash256> {
        self.0.iter()
    }
}

/// A validator's current position for one round.
///
/// At most one proposal per validator is live at a time; a later one
/// supersedes the earlier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub validator: ValidatorId,
    pub round_id: u32,
    pub position: TxSet,
    pub timestamp_ms: u64,
}

/// Consensus phase. Transitions are strictly monotonic; `Closed` is
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Open,
    Establish,
    Accept,
    Closed,
}

impl Phase {
    /// Monotonic rank used to assert phases never move backwards.
    pub fn rank(&self) -> u8 {
        match self {
            Phase::Open => 0,
            Phase::Establish => 1,
            Phase::Accept => 2,
            Phase::Closed => 3,
        }
    }
}

/// State of a single consensus round.
#[derive(Clone, Debug)]
pub struct ConsensusRound {
    pub round_id: u32,
    pub phase: Phase,
    pub tick_count: u32,
    pub start_time_ms: u64,
    pub accepted_set: Option<TxSet>,
    pub(crate) proposals: BTreeMap<ValidatorId, Proposal>,
    pub(crate) local_txs: TxSet,
    pub(crate) working_set: TxSet,
    pub(crate) prev_working_set: Option<TxSet>,
    pub(crate) establish_ticks: u32,
    pub(crate) threshold_pct: u32,
}

impl ConsensusRound {
    /// Opens a new round, optionally seeded with proposals carried over
    /// from an aborted predecessor.
    pub fn open(
        round_id: u32,
        start_time_ms: u64,
        carried: BTreeMap<ValidatorId, Proposal>,
    ) -> Self {
        Self {
            round_id,
            phase: Phase::Open,
            tick_count: 0,
            start_time_ms,
            accepted_set: None,
            proposals: carried,
            local_txs: TxSet::new(),
            working_set: TxSet::new(),
            prev_working_set: None,
            establish_ticks: 0,
            threshold_pct: 50,
        }
    }

    /// Number of validators with a live proposal this round.
    pub fn active_validators(&self) -> usize {
        self.proposals.len()
    }

    /// Current support threshold, in integer percent.
    pub fn threshold_pct(&self) -> u32 {
        self.threshold_pct
    }

    /// The working set as of the last establish evaluation.
    pub fn working_set(&self) -> &TxSet {
        &self.working_set
    }

    /// Moves to `next`, asserting monotonicity.
    pub(crate) fn advance_phase(&mut self, next: Phase) {
        debug_assert!(next.rank() >= self.phase.rank(), "phase moved backwards");
        self.phase = next;
    }
}
