//! Ledger manager: the open ledger and its history.
//!
//! The manager exclusively owns the mutable [`AccountState`] and the
//! single open ledger. Closing seals the open ledger into an immutable
//! [`Ledger`], pushes the previous closed ledger into a bounded in-memory
//! history ring, and reopens the next sequence on the same state.

use std::collections::VecDeque;

use crate::config::FeeConfig;
use crate::pipeline::{self, Receipt, Transaction};
use crate::types::{Account, AccountId, Drops, Hash256, LedgerSeq};

use super::{AccountState, Ledger, compute_ledger_hash, compute_transaction_hash};

/// Closed ledgers kept in memory besides the most recent one.
pub const HISTORY_CAP: usize = 256;

/// Sequence number of the genesis ledger.
pub const GENESIS_SEQ: LedgerSeq = 1;

/// Close times are rounded down to a multiple of this resolution.
pub const CLOSE_TIME_RESOLUTION: u32 = 10;

/// Total drops in existence at genesis (100 billion XRP).
pub const GENESIS_TOTAL_COINS: Drops = Drops(100_000_000_000 * 1_000_000);

/// Owner of the open ledger and the account state behind it.
#[derive(Clone, Debug)]
pub struct LedgerManager {
    state: AccountState,
    last_closed: Ledger,
    history: VecDeque<Ledger>,
    open_sequence: LedgerSeq,
    open_parent_hash: Hash256,
    open_parent_close_time: u64,
    open_transactions: Vec<Hash256>,
    total_coins: Drops,
}

impl LedgerManager {
    /// Creates a manager holding a sealed genesis ledger and an empty
    /// open ledger right after it.
    pub fn new() -> Self {
        let state = AccountState::new();
        let account_state_hash = state.compute_state_hash();
        let transaction_hash = compute_transaction_hash(&[]);
        let hash = compute_ledger_hash(
            GENESIS_SEQ,
            &Hash256::ZERO,
            0,
            &account_state_hash,
            &transaction_hash,
        );

        let genesis = Ledger {
            sequence: GENESIS_SEQ,
            parent_hash: Hash256::ZERO,
            close_time: 0,
            parent_close_time: 0,
            close_time_resolution: CLOSE_TIME_RESOLUTION,
            close_flags: 0,
            total_coins: GENESIS_TOTAL_COINS,
            account_state_hash,
            transaction_hash,
            hash,
            closed: true,
            transactions: Vec::new(),
        };

        Self {
            state,
            open_sequence: GENESIS_SEQ + 1,
            open_parent_hash: genesis.hash,
            open_parent_close_time: 0,
            open_transactions: Vec::new(),
            last_closed: genesis,
            history: VecDeque::new(),
            total_coins: GENESIS_TOTAL_COINS,
        }
    }

    /// Funds an account directly, outside the transaction pipeline.
    ///
    /// Bootstrap-only: simulations and tests use this to stand up a
    /// populated ledger without replaying a funding history.
    pub fn genesis_fund(&mut self, id: AccountId, balance: Drops) {
        self.state.insert(Account::new(id, balance));
    }

    /// Read access to the account state.
    pub fn state(&self) -> &AccountState {
        &self.state
    }

    /// The most recent closed ledger.
    pub fn last_closed(&self) -> &Ledger {
        &self.last_closed
    }

    /// Sequence of the currently open ledger.
    pub fn open_sequence(&self) -> LedgerSeq {
        self.open_sequence
    }

    /// Transactions applied to the open ledger so far.
    pub fn open_transaction_count(&self) -> usize {
        self.open_transactions.len()
    }

    /// Drops currently in existence (fees are destroyed on application).
    pub fn total_coins(&self) -> Drops {
        self.total_coins
    }

    /// Looks up a closed ledger by sequence number.
    pub fn ledger_by_seq(&self, sequence: LedgerSeq) -> Option<&Ledger> {
        if self.last_closed.sequence == sequence {
            return Some(&self.last_closed);
        }
        self.history.iter().find(|l| l.sequence == sequence)
    }

    /// Applies one transaction to the open ledger.
    ///
    /// On success the fee is destroyed (total coins shrink) and the
    /// transaction hash joins the open ledger's applied list.
    pub fn apply_transaction(&mut self, tx: &Transaction, fees: &FeeConfig) -> Receipt {
        let receipt = pipeline::apply(&mut self.state, tx, fees, self.open_sequence);
        if receipt.result.is_success() {
            self.open_transactions.push(receipt.tx_hash);
            self.total_coins = self
                .total_coins
                .checked_sub(receipt.fee_charged)
                .unwrap_or(Drops::ZERO);
            tracing::debug!(
                tx = %receipt.tx_hash,
                ledger = self.open_sequence,
                "applied transaction"
            );
        }
        receipt
    }

    /// Applies an accepted transaction set in canonical order, then
    /// closes the ledger. This is the consensus Accept path.
    pub fn close_with_set(
        &mut self,
        mut txs: Vec<Transaction>,
        fees: &FeeConfig,
        close_time: u64,
    ) -> Vec<Receipt> {
        pipeline::canonical_order(&mut txs);
        let receipts: Vec<Receipt> = txs
            .iter()
            .map(|tx| self.apply_transaction(tx, fees))
            .collect();
        self.close_ledger(close_time);
        receipts
    }

    /// Seals the open ledger and reopens the next one.
    ///
    /// Freezes the state snapshot, computes the state/transaction roots
    /// and the ledger hash, advances the sequence, and starts a fresh
    /// open ledger whose parent is the ledger just closed.
    pub fn close_ledger(&mut self, close_time: u64) -> &Ledger {
        let rounded_close =
            close_time - (close_time % u64::from(CLOSE_TIME_RESOLUTION));
        let account_state_hash = self.state.compute_state_hash();
        let transactions = std::mem::take(&mut self.open_transactions);
        let transaction_hash = compute_transaction_hash(&transactions);
        let hash = compute_ledger_hash(
            self.open_sequence,
            &self.open_parent_hash,
            rounded_close,
            &account_state_hash,
            &transaction_hash,
        );

        let closed = Ledger {
            sequence: self.open_sequence,
            parent_hash: self.open_parent_hash,
            close_time: rounded_close,
            parent_close_time: self.open_parent_close_time,
            close_time_resolution: CLOSE_TIME_RESOLUTION,
            close_flags: 0,
            total_coins: self.total_coins,
            account_state_hash,
            transaction_hash,
            hash,
            closed: true,
            transactions,
        };

        let previous = std::mem::replace(&mut self.last_closed, closed);
        self.history.push_back(previous);
        while self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }

        self.open_sequence += 1;
        self.open_parent_hash = self.last_closed.hash;
        self.open_parent_close_time = rounded_close;

        tracing::info!(
            sequence = self.last_closed.sequence,
            hash = %self.last_closed.hash,
            txs = self.last_closed.transactions.len(),
            "closed ledger"
        );
        &self.last_closed
    }
}

impl Default for LedgerManager {
    fn default() -> Self {
        Self::new()
    }
}
