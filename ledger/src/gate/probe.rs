//! Invariant probe: replays a scripted apply run and recomputes hashes.
//!
//! The probe stands up a fresh ledger manager, drives a short
//! deterministic transaction script through the pipeline, and checks the
//! structural invariants a correct engine can never violate: sequence
//! monotonicity, rejected replays leaving state untouched, and ledger
//! hashes recomputing from header fields.

use crate::config::FeeConfig;
use crate::ledger::{LedgerManager, compute_ledger_hash};
use crate::pipeline::{Transaction, TxPayload};
use crate::types::{ACCOUNT_ID_LEN, AccountId, DROPS_PER_XRP, Drops};

fn probe_account(byte: u8) -> AccountId {
    AccountId([byte; ACCOUNT_ID_LEN])
}

/// Runs the probe. Any violated invariant fails with a one-line reason.
pub fn run() -> Result<(), String> {
    let fees = FeeConfig::default();
    let mut manager = LedgerManager::new();
    manager.genesis_fund(probe_account(1), Drops(1_000 * DROPS_PER_XRP));
    manager.genesis_fund(probe_account(2), Drops(500 * DROPS_PER_XRP));

    // Script: a settings change, a payment, and a replay of the first
    // transaction which must be rejected without side effects.
    let set = Transaction {
        account: probe_account(1),
        fee: Drops(10),
        sequence: 1,
        payload: TxPayload::AccountSet,
    };
    let pay = Transaction {
        account: probe_account(1),
        fee: Drops(10),
        sequence: 2,
        payload: TxPayload::Payment {
            destination: probe_account(2),
            amount: Drops(40 * DROPS_PER_XRP),
        },
    };

    let mut last_sequence = 0;
    for tx in [&set, &pay] {
        let receipt = manager.apply_transaction(tx, &fees);
        if !receipt.result.is_success() {
            return Err(format!(
                "probe transaction seq {} failed with {}",
                tx.sequence,
                receipt.result.token()
            ));
        }
        let sequence = manager
            .state()
            .get(&probe_account(1))
            .map(|a| a.sequence)
            .unwrap_or(0);
        if sequence <= last_sequence {
            return Err("account sequence is not strictly monotonic".to_string());
        }
        last_sequence = sequence;
    }

    let generation_before = manager.state().generation();
    let replay = manager.apply_transaction(&set, &fees);
    if replay.result.is_success() {
        return Err("replayed transaction was accepted".to_string());
    }
    if manager.state().generation() != generation_before {
        return Err("rejected replay mutated account state".to_string());
    }

    let closed = manager.close_ledger(1_000).clone();
    let recomputed = compute_ledger_hash(
        closed.sequence,
        &closed.parent_hash,
        closed.close_time,
        &closed.account_state_hash,
        &closed.transaction_hash,
    );
    if recomputed != closed.hash {
        return Err(format!(
            "ledger hash {} does not recompute from header fields ({recomputed})",
            closed.hash
        ));
    }
    if closed.account_state_hash != manager.state().compute_state_hash() {
        return Err("closed state root does not match live state".to_string());
    }
    if closed.transactions.len() != 2 {
        return Err(format!(
            "expected 2 applied transactions, found {}",
            closed.transactions.len()
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn probe_passes_on_a_correct_engine() {
        super::run().unwrap();
    }
}
