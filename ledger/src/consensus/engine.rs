//! Phased consensus engine.
//!
//! The engine is a tick-driven state machine over a single active
//! [`ConsensusRound`]: `(round, tick) -> round`. Nothing here reads the
//! wall clock; the caller supplies `now_ms` with each tick, which keeps
//! simulated and live pacing on the identical code path.
//!
//! Phases:
//!
//! - **Open** collects proposals and locally admitted transactions.
//! - **Establish** repeatedly evaluates per-hash support against a rising
//!   threshold (50% + 5% per `consensus_round_ticks`, capped at the final
//!   threshold) until the working set is stable or the phase budget ends.
//! - **Accept** closes the round when enough validators' latest positions
//!   equal the working set, and aborts into a fresh round otherwise.
//!
//! A round that burns `max_iterations` ticks without closing is stalled:
//! it is discarded, surfaced through counters, and never persisted.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::Hash256;

use super::config::ConsensusConfig;
use super::error::ConsensusError;
use super::round::{ConsensusRound, Phase, Proposal, TxSet};
#[cfg(test)]
use super::round::ValidatorId;

/// Result of one engine tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Round still in flight.
    Pending,
    /// Round closed; the accepted set should seal the next ledger.
    Accepted(TxSet),
    /// Accept failed its threshold; a fresh round has already opened
    /// with the live proposals carried over.
    Aborted { round_id: u32 },
    /// `max_iterations` elapsed; the round was discarded.
    Stalled { round_id: u32 },
}

/// Monotonic counters describing engine activity.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct EngineStats {
    pub rounds_accepted: u64,
    pub rounds_aborted: u64,
    pub rounds_stalled: u64,
    pub proposals_dropped: u64,
}

/// Tick-driven consensus engine.
///
/// Owns at most one live round; all timing and threshold parameters come
/// from the injected [`ConsensusConfig`].
#[derive(Clone, Debug)]
pub struct ConsensusEngine {
    config: ConsensusConfig,
    round: Option<ConsensusRound>,
    next_round_id: u32,
    pending_local: TxSet,
    stats: EngineStats,
}

impl ConsensusEngine {
    pub fn new(config: ConsensusConfig) -> Self {
        Self {
            config,
            round: None,
            next_round_id: 1,
            pending_local: TxSet::new(),
            stats: EngineStats::default(),
        }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// The active round, if one is open.
    pub fn round(&self) -> Option<&ConsensusRound> {
        self.round.as_ref()
    }

    /// Opens a fresh round at `now_ms`, draining locally admitted
    /// transactions into its position.
    pub fn start_round(&mut self, now_ms: u64) -> u32 {
        let round_id = self.next_round_id;
        self.next_round_id += 1;

        let mut round = ConsensusRound::open(round_id, now_ms, BTreeMap::new());
        round.local_txs = std::mem::take(&mut self.pending_local);
        tracing::debug!(round_id, "opened consensus round");
        self.round = Some(round);
        round_id
    }

    /// Admits a local transaction hash into the current open phase, or
    /// queues it for the next round.
    pub fn admit_tx(&mut self, hash: Hash256) {
        if let Some(round) = &mut self.round {
            if round.phase == Phase::Open {
                round.local_txs.insert(hash);
                return;
            }
        }
        self.pending_local.insert(hash);
    }

    /// Records a validator's position for the active round.
    ///
    /// A later proposal from the same validator supersedes its earlier
    /// one. Malformed identities and proposals for other rounds are
    /// rejected.
    pub fn add_proposal(&mut self, proposal: Proposal) -> Result<(), ConsensusError> {
        if proposal.validator.is_malformed() {
            return Err(ConsensusError::MalformedValidator);
        }
        let round = self
            .round
            .as_mut()
            .ok_or(ConsensusError::NoActiveRound)?;
        if round.phase == Phase::Closed {
            return Err(ConsensusError::NoActiveRound);
        }
        if proposal.round_id != round.round_id {
            return Err(ConsensusError::WrongRound {
                got: proposal.round_id,
                active: round.round_id,
            });
        }

        round.proposals.insert(proposal.validator, proposal);
        Ok(())
    }

    /// Decodes and records an encoded proposal.
    ///
    /// Blobs that fail to decode are dropped and counted, never fatal.
    pub fn ingest_proposal_bytes(&mut self, bytes: &[u8]) -> Result<(), ConsensusError> {
        match serde_json::from_slice::<Proposal>(bytes) {
            Ok(proposal) => self.add_proposal(proposal),
            Err(err) => {
                self.stats.proposals_dropped += 1;
                tracing::debug!(%err, "dropped undecodable proposal");
                Ok(())
            }
        }
    }

    /// Advances the round by one tick.
    ///
    /// All state transitions happen here. Ticking a closed round is
    /// idempotent and re-reports the accepted set.
    pub fn tick(&mut self, now_ms: u64) -> Result<TickOutcome, ConsensusError> {
        let config = self.config.clone();
        let round = self.round.as_mut().ok_or(ConsensusError::NoActiveRound)?;

        if round.phase == Phase::Closed {
            let set = round
                .accepted_set
                .clone()
                .unwrap_or_default();
            return Ok(TickOutcome::Accepted(set));
        }

        round.tick_count += 1;

        let outcome = match round.phase {
            Phase::Open => {
                let ticks_done = round.tick_count >= config.open_phase_ticks;
                let time_done =
                    now_ms.saturating_sub(round.start_time_ms) >= u64::from(config.open_phase_ms);
                if ticks_done || time_done {
                    round.advance_phase(Phase::Establish);
                }
                TickOutcome::Pending
            }
            Phase::Establish => {
                round.establish_ticks += 1;
                round.threshold_pct = schedule_threshold(&config, round.establish_ticks);

                let working = evaluate_working_set(round, round.threshold_pct);
                let stable = round.prev_working_set.as_ref() == Some(&working);
                round.prev_working_set = Some(working.clone());
                round.working_set = working;

                if stable || round.establish_ticks >= config.establish_phase_ticks {
                    round.advance_phase(Phase::Accept);
                }
                TickOutcome::Pending
            }
            Phase::Accept => {
                let active = round.active_validators() as u64;
                // Candidate selection goes through the tie-break rule:
                // the best-supported full position, lexicographically
                // smaller on equal support. The round closes only when
                // that candidate is the established working set and
                // clears the final threshold.
                let (candidate_is_working_set, agreeing) =
                    match best_position(round.proposals.values().map(|p| &p.position)) {
                        Some((position, count)) => (*position == round.working_set, count),
                        None => (true, 0),
                    };

                if candidate_is_working_set
                    && agreeing * 100 >= u64::from(config.final_threshold_pct) * active
                {
                    let accepted = round.working_set.clone();
                    round.accepted_set = Some(accepted.clone());
                    round.advance_phase(Phase::Closed);
                    self.stats.rounds_accepted += 1;
                    tracing::info!(
                        round_id = round.round_id,
                        txs = accepted.len(),
                        "round accepted"
                    );
                    TickOutcome::Accepted(accepted)
                } else {
                    let aborted_id = round.round_id;
                    let carried = std::mem::take(&mut round.proposals);
                    self.stats.rounds_aborted += 1;
                    tracing::info!(round_id = aborted_id, agreeing, active, "round aborted");

                    let round_id = self.next_round_id;
                    self.next_round_id += 1;
                    let mut fresh = ConsensusRound::open(round_id, now_ms, carried);
                    fresh.local_txs = std::mem::take(&mut self.pending_local);
                    self.round = Some(fresh);
                    return Ok(TickOutcome::Aborted { round_id: aborted_id });
                }
            }
            Phase::Closed => unreachable!("handled above"),
        };

        if matches!(outcome, TickOutcome::Pending) {
            if let Some(round) = self.round.as_ref() {
                if round.tick_count >= config.max_iterations {
                    let round_id = round.round_id;
                    self.round = None;
                    self.stats.rounds_stalled += 1;
                    tracing::warn!(round_id, "{}", ConsensusError::Stalled(config.max_iterations));
                    return Ok(TickOutcome::Stalled { round_id });
                }
            }
        }

        Ok(outcome)
    }
}

/// Support threshold after `establish_ticks` establish evaluations:
/// starts at 50%, +5% every `consensus_round_ticks`, capped at the final
/// threshold.
fn schedule_threshold(config: &ConsensusConfig, establish_ticks: u32) -> u32 {
    let cadence = config.consensus_round_ticks.max(1);
    let raises = establish_ticks.saturating_sub(1) / cadence;
    (50 + 5 * raises).min(config.final_threshold_pct)
}

/// Computes the working set at the given threshold.
///
/// A hash is in when `supporters * 100 >= threshold_pct * active`. With
/// no active validators the engine is proposing solo, and its locally
/// admitted transactions form the set.
fn evaluate_working_set(round: &ConsensusRound, threshold_pct: u32) -> TxSet {
    let active = round.active_validators() as u64;
    if active == 0 {
        return round.local_txs.clone();
    }

    let mut support: BTreeMap<Hash256, u64> = BTreeMap::new();
    for proposal in round.proposals.values() {
        for hash in proposal.position.iter() {
            *support.entry(*hash).or_insert(0) += 1;
        }
    }

    TxSet::from_hashes(
        support
            .into_iter()
            .filter(|(_, supporters)| supporters * 100 >= u64::from(threshold_pct) * active)
            .map(|(hash, _)| hash),
    )
}

/// Picks the accept candidate: the best-supported full position among
/// `candidates`, with equal-support ties resolving to the
/// lexicographically smaller set.
pub fn best_position<'a, I>(candidates: I) -> Option<(&'a TxSet, u64)>
where
    I: IntoIterator<Item = &'a TxSet>,
{
    let mut counts: BTreeMap<&'a TxSet, u64> = BTreeMap::new();
    for set in candidates {
        *counts.entry(set).or_insert(0) += 1;
    }
    // Ascending TxSet order with a strictly-greater max keeps the
    // lexicographically smaller set on ties.
    let mut best: Option<(&'a TxSet, u64)> = None;
    for (set, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((set, count)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ACCOUNT_ID_LEN;

    fn hash(byte: u8) -> Hash256 {
        Hash256([byte; 32])
    }

    fn validator(byte: u8) -> ValidatorId {
        ValidatorId([byte; ACCOUNT_ID_LEN])
    }

    fn proposal(v: u8, round_id: u32, hashes: &[u8]) -> Proposal {
        Proposal {
            validator: validator(v),
            round_id,
            position: TxSet::from_hashes(hashes.iter().map(|b| hash(*b))),
            timestamp_ms: 0,
        }
    }

    fn tick_until_terminal(engine: &mut ConsensusEngine, limit: u32) -> (TickOutcome, u32) {
        for t in 1..=limit {
            let outcome = engine.tick(u64::from(t) * 100).unwrap();
            if !matches!(outcome, TickOutcome::Pending) {
                return (outcome, t);
            }
        }
        panic!("no terminal outcome within {limit} ticks");
    }

    #[test]
    fn unanimous_validators_reach_accept() {
        let config = ConsensusConfig::default();
        let max = config.max_iterations;
        let mut engine = ConsensusEngine::new(config);
        engine.start_round(0);

        for v in 1..=5 {
            engine.add_proposal(proposal(v, 1, &[10, 11, 12])).unwrap();
        }

        let (outcome, ticks) = tick_until_terminal(&mut engine, max);
        match outcome {
            TickOutcome::Accepted(set) => {
                assert_eq!(set, TxSet::from_hashes([hash(10), hash(11), hash(12)]));
            }
            other => panic!("expected accept, got {other:?}"),
        }
        assert!(ticks <= max);
        assert_eq!(engine.stats().rounds_accepted, 1);

        let round = engine.round().unwrap();
        assert_eq!(round.phase, Phase::Closed);
        assert!(round.accepted_set.is_some());
    }

    #[test]
    fn four_of_five_meet_the_default_threshold() {
        let mut engine = ConsensusEngine::new(ConsensusConfig::default());
        engine.start_round(0);

        for v in 1..=4 {
            engine.add_proposal(proposal(v, 1, &[7])).unwrap();
        }
        engine.add_proposal(proposal(5, 1, &[9])).unwrap();

        let (outcome, _) = tick_until_terminal(&mut engine, 32);
        // 4/5 = 80% agree on {7}: exactly the final threshold.
        assert_eq!(outcome, TickOutcome::Accepted(TxSet::from_hashes([hash(7)])));
    }

    #[test]
    fn split_validators_abort_and_reopen_with_proposals() {
        let mut engine = ConsensusEngine::new(ConsensusConfig::default());
        engine.start_round(0);

        // 3/5 vs 2/5: {7} clears the 50% support bar early, but only
        // 60% of validators hold exactly the working set at Accept.
        for v in 1..=3 {
            engine.add_proposal(proposal(v, 1, &[7])).unwrap();
        }
        for v in 4..=5 {
            engine.add_proposal(proposal(v, 1, &[9])).unwrap();
        }

        let (outcome, _) = tick_until_terminal(&mut engine, 32);
        assert_eq!(outcome, TickOutcome::Aborted { round_id: 1 });
        assert_eq!(engine.stats().rounds_aborted, 1);

        // A fresh round is live, carrying the five proposals (which still
        // reference round 1 and would be superseded by re-proposals).
        let round = engine.round().unwrap();
        assert_eq!(round.round_id, 2);
        assert_eq!(round.phase, Phase::Open);
        assert_eq!(round.active_validators(), 5);
    }

    #[test]
    fn round_stalls_at_max_iterations() {
        // An open phase that can never finish within the tick budget.
        let config = ConsensusConfig {
            open_phase_ticks: 1_000,
            open_phase_ms: 1_000_000,
            max_iterations: 6,
            ..ConsensusConfig::default()
        };
        let mut engine = ConsensusEngine::new(config);
        engine.start_round(0);

        let mut last = TickOutcome::Pending;
        for t in 1..=6 {
            last = engine.tick(t * 10).unwrap();
        }
        assert_eq!(last, TickOutcome::Stalled { round_id: 1 });
        assert_eq!(engine.stats().rounds_stalled, 1);
        assert!(engine.round().is_none());
    }

    #[test]
    fn threshold_schedule_rises_and_caps() {
        let config = ConsensusConfig::default();

        assert_eq!(schedule_threshold(&config, 1), 50);
        assert_eq!(schedule_threshold(&config, 2), 50);
        assert_eq!(schedule_threshold(&config, 3), 55);
        assert_eq!(schedule_threshold(&config, 5), 60);
        // Far beyond the cap.
        assert_eq!(schedule_threshold(&config, 99), config.final_threshold_pct);
    }

    #[test]
    fn working_set_obeys_integer_threshold() {
        let mut round = ConsensusRound::open(1, 0, BTreeMap::new());
        for v in 1..=3 {
            round
                .proposals
                .insert(validator(v), proposal(v, 1, &[7]));
        }
        for v in 4..=5 {
            round
                .proposals
                .insert(validator(v), proposal(v, 1, &[9]));
        }

        // 3/5 = 60% support for {7}, 40% for {9}.
        let at_50 = evaluate_working_set(&round, 50);
        assert!(at_50.contains(&hash(7)));
        assert!(!at_50.contains(&hash(9)));

        let at_80 = evaluate_working_set(&round, 80);
        assert!(at_80.is_empty());
    }

    #[test]
    fn phase_never_moves_backwards() {
        let mut engine = ConsensusEngine::new(ConsensusConfig::default());
        engine.start_round(0);
        for v in 1..=3 {
            engine.add_proposal(proposal(v, 1, &[1])).unwrap();
        }

        let mut last_rank = 0u8;
        for t in 1..40 {
            let phase = match engine.round() {
                Some(round) => round.phase,
                None => break,
            };
            assert!(phase.rank() >= last_rank);
            last_rank = phase.rank();
            if engine.tick(t * 10).is_err() {
                break;
            }
        }
    }

    #[test]
    fn open_phase_exits_on_wall_time() {
        let config = ConsensusConfig {
            open_phase_ticks: 1_000,
            open_phase_ms: 50,
            ..ConsensusConfig::default()
        };
        let mut engine = ConsensusEngine::new(config);
        engine.start_round(0);

        engine.tick(10).unwrap();
        assert_eq!(engine.round().unwrap().phase, Phase::Open);

        engine.tick(60).unwrap();
        assert_eq!(engine.round().unwrap().phase, Phase::Establish);
    }

    #[test]
    fn solo_engine_accepts_locally_admitted_txs() {
        let mut engine = ConsensusEngine::new(ConsensusConfig::default());
        engine.admit_tx(hash(42));
        engine.start_round(0);
        engine.admit_tx(hash(43));

        let (outcome, _) = tick_until_terminal(&mut engine, 32);
        assert_eq!(
            outcome,
            TickOutcome::Accepted(TxSet::from_hashes([hash(42), hash(43)]))
        );
    }

    #[test]
    fn malformed_validator_is_rejected() {
        let mut engine = ConsensusEngine::new(ConsensusConfig::default());
        engine.start_round(0);

        let bad = Proposal {
            validator: ValidatorId([0; ACCOUNT_ID_LEN]),
            round_id: 1,
            position: TxSet::new(),
            timestamp_ms: 0,
        };
        assert_eq!(
            engine.add_proposal(bad),
            Err(ConsensusError::MalformedValidator)
        );
    }

    #[test]
    fn wrong_round_proposal_is_rejected() {
        let mut engine = ConsensusEngine::new(ConsensusConfig::default());
        engine.start_round(0);

        assert_eq!(
            engine.add_proposal(proposal(1, 9, &[1])),
            Err(ConsensusError::WrongRound { got: 9, active: 1 })
        );
    }

    #[test]
    fn undecodable_proposals_bump_the_drop_counter() {
        let mut engine = ConsensusEngine::new(ConsensusConfig::default());
        engine.start_round(0);

        engine.ingest_proposal_bytes(b"not json").unwrap();
        engine.ingest_proposal_bytes(b"{\"garbage\":1}").unwrap();
        assert_eq!(engine.stats().proposals_dropped, 2);
        assert_eq!(engine.round().unwrap().active_validators(), 0);

        let good = serde_json::to_vec(&proposal(1, 1, &[5])).unwrap();
        engine.ingest_proposal_bytes(&good).unwrap();
        assert_eq!(engine.round().unwrap().active_validators(), 1);
    }

    #[test]
    fn tie_on_support_prefers_lexicographically_smaller_set() {
        let small = TxSet::from_hashes([hash(1)]);
        let large = TxSet::from_hashes([hash(2)]);

        let (best, count) = best_position([&large, &small, &large, &small]).unwrap();
        assert_eq!(count, 2);
        assert_eq!(best, &small);
    }

    #[test]
    fn ticking_a_closed_round_is_idempotent() {
        let mut engine = ConsensusEngine::new(ConsensusConfig::default());
        engine.start_round(0);
        for v in 1..=5 {
            engine.add_proposal(proposal(v, 1, &[3])).unwrap();
        }
        let (outcome, _) = tick_until_terminal(&mut engine, 32);
        let accepted = match outcome {
            TickOutcome::Accepted(set) => set,
            other => panic!("expected accept, got {other:?}"),
        };

        let again = engine.tick(99_999).unwrap();
        assert_eq!(again, TickOutcome::Accepted(accepted));
        assert_eq!(engine.stats().rounds_accepted, 1);
    }
}
