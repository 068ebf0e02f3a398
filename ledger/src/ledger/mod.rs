//! Ledger headers and the ledger manager.
//!
//! A [`Ledger`] is an immutable, sealed snapshot: header fields, the
//! canonical state root, and the hashes of the transactions it applied.
//! The [`LedgerManager`] owns the single open ledger and the account
//! state behind it.

use serde::{Deserialize, Serialize};

use crate::crypto::sha512_half;
use crate::types::{Drops, Hash256, LedgerSeq};

pub mod manager;
pub mod state;

pub use manager::LedgerManager;
pub use state::AccountState;

/// A sealed (closed) ledger.
///
/// Never mutated after construction; `hash` commits to the header fields
/// via [`compute_ledger_hash`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub sequence: LedgerSeq,
    pub parent_hash: Hash256,
    pub close_time: u64,
    pub parent_close_time: u64,
    pub close_time_resolution: u32,
    pub close_flags: u32,
    pub total_coins: Drops,
    pub account_state_hash: Hash256,
    pub transaction_hash: Hash256,
    pub hash: Hash256,
    pub closed: bool,
    /// Hashes of the transactions applied in this ledger, in applied
    /// (canonical) order.
    pub transactions: Vec<Hash256>,
}

/// Canonical ledger hash:
/// `sha512_half(sequence ‖ parent_hash ‖ close_time ‖ state_root ‖ tx_root)`
/// with integers big-endian.
pub fn compute_ledger_hash(
    sequence: LedgerSeq,
    parent_hash: &Hash256,
    close_time: u64,
    account_state_hash: &Hash256,
    transaction_hash: &Hash256,
) -> Hash256 {
    let mut buf = Vec::with_capacity(4 + 32 + 8 + 32 + 32);
    buf.extend_from_slice(&sequence.to_be_bytes());
    buf.extend_from_slice(parent_hash.as_bytes());
    buf.extend_from_slice(&close_time.to_be_bytes());
    buf.extend_from_slice(account_state_hash.as_bytes());
    buf.extend_from_slice(transaction_hash.as_bytes());
    sha512_half(&buf)
}

/// Folds transaction hashes, in applied order, into the transaction root.
pub fn compute_transaction_hash(tx_hashes: &[Hash256]) -> Hash256 {
    let mut root = Hash256::ZERO;
    for tx in tx_hashes {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(root.as_bytes());
        buf.extend_from_slice(tx.as_bytes());
        root = sha512_half(&buf);
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_hash_commits_to_every_header_field() {
        let state_root = Hash256([1; 32]);
        let tx_root = Hash256([2; 32]);
        let parent = Hash256([3; 32]);

        let base = compute_ledger_hash(7, &parent, 1_000, &state_root, &tx_root);

        assert_ne!(base, compute_ledger_hash(8, &parent, 1_000, &state_root, &tx_root));
        assert_ne!(
            base,
            compute_ledger_hash(7, &Hash256([4; 32]), 1_000, &state_root, &tx_root)
        );
        assert_ne!(base, compute_ledger_hash(7, &parent, 1_001, &state_root, &tx_root));
        assert_ne!(
            base,
            compute_ledger_hash(7, &parent, 1_000, &Hash256([5; 32]), &tx_root)
        );
        assert_ne!(
            base,
            compute_ledger_hash(7, &parent, 1_000, &state_root, &Hash256([6; 32]))
        );
    }

    #[test]
    fn transaction_root_depends_on_order() {
        let a = Hash256([1; 32]);
        let b = Hash256([2; 32]);

        assert_ne!(
            compute_transaction_hash(&[a, b]),
            compute_transaction_hash(&[b, a])
        );
        assert_eq!(compute_transaction_hash(&[]), Hash256::ZERO);
    }
}
