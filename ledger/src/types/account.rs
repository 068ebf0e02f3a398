//! Account state entry.

use serde::{Deserialize, Serialize};

use super::{AccountId, Drops, Hash256, LedgerSeq};

/// A funded account as stored in ledger state.
///
/// Accounts are created by the first transaction that funds them and are
/// never deleted; balances may only be reduced down to the reserve.
/// `sequence` is strictly monotonic: it advances by exactly one for every
/// transaction applied on behalf of this account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Identifier derived from the owning public key.
    pub id: AccountId,
    /// Spendable balance in drops.
    pub balance: Drops,
    /// Sequence number the account's next transaction must carry.
    pub sequence: u32,
    /// Account-level flag bits.
    pub flags: u32,
    /// Number of reserve-weighted objects (trust lines, offers, escrows,
    /// channels, checks) owned by this account.
    pub owner_count: u32,
    /// Hash of the last transaction applied to this account.
    pub previous_txn_id: Hash256,
    /// Sequence of the ledger that applied `previous_txn_id`.
    pub previous_txn_lgr_seq: LedgerSeq,
}

impl Account {
    /// Creates a freshly funded account.
    ///
    /// New accounts start at sequence 1, with no flags and no owned
    /// objects; the funding transaction's hash is recorded by the caller
    /// once the application commits.
    pub fn new(id: AccountId, balance: Drops) -> Self {
        Self {
            id,
            balance,
            sequence: 1,
            flags: 0,
            owner_count: 0,
            previous_txn_id: Hash256::ZERO,
            previous_txn_lgr_seq: 0,
        }
    }
}
