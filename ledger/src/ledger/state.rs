//! Account state map.
//!
//! Accounts live in a dense arena (`Vec<Account>`) with a stable
//! `AccountId -> slot` index on the side. Iteration always follows
//! ascending account-id byte order, which is what the canonical state
//! hash and deterministic RPC output rely on. A generation counter
//! advances on every mutation so snapshots can be identified cheaply.

use std::collections::BTreeMap;

use crate::crypto::sha512_half;
use crate::types::{Account, AccountId, Hash256};

/// Mapping from account id to account, with deterministic iteration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountState {
    arena: Vec<Account>,
    index: BTreeMap<AccountId, u32>,
    generation: u64,
}

impl AccountState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of funded accounts.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Mutation counter; bumped by every insert or update.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.index.contains_key(id)
    }

    /// Fetches an account by id.
    pub fn get(&self, id: &AccountId) -> Option<&Account> {
        self.index
            .get(id)
            .map(|slot| &self.arena[*slot as usize])
    }

    /// Inserts or replaces an account, keyed by its own id.
    pub fn insert(&mut self, account: Account) {
        self.generation += 1;
        match self.index.get(&account.id) {
            Some(slot) => self.arena[*slot as usize] = account,
            None => {
                let slot = self.arena.len() as u32;
                self.index.insert(account.id, slot);
                self.arena.push(account);
            }
        }
    }

    /// Iterates accounts in ascending id byte order.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.index.values().map(|slot| &self.arena[*slot as usize])
    }

    /// Canonical state root.
    ///
    /// Folds every account, in ascending id order, through sha512_half:
    /// `h' = H(h ‖ id ‖ balance ‖ sequence ‖ flags ‖ owner_count)`,
    /// starting from the zero hash. Identical states therefore hash
    /// identically regardless of insertion order.
    pub fn compute_state_hash(&self) -> Hash256 {
        let mut root = Hash256::ZERO;
        for account in self.iter() {
            let mut buf = Vec::with_capacity(32 + 20 + 8 + 4 + 4 + 4);
            buf.extend_from_slice(root.as_bytes());
            buf.extend_from_slice(account.id.as_bytes());
            buf.extend_from_slice(&account.balance.0.to_be_bytes());
            buf.extend_from_slice(&account.sequence.to_be_bytes());
            buf.extend_from_slice(&account.flags.to_be_bytes());
            buf.extend_from_slice(&account.owner_count.to_be_bytes());
            root = sha512_half(&buf);
        }
        root
    }
}
