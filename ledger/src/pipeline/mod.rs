//! Transaction pipeline: decode, validate, apply.
//!
//! The pipeline owns a transaction from the moment its blob arrives until
//! it is either absorbed into the open ledger or rejected. Application is
//! atomic per transaction: effects are staged against copies of the
//! touched accounts and committed only when every check passes, so a
//! failing transaction leaves state untouched and yields a `tec*` result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::FeeConfig;
use crate::ledger::AccountState;
use crate::types::{Account, Drops, Hash256, LedgerSeq};

pub mod wire;

pub use wire::{Transaction, TxPayload, TxType};

/// Local pipeline errors (pre-receipt).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Blob length or shape does not match any transaction type.
    #[error("InvalidTxBlob")]
    InvalidTxBlob,
}

/// Engine result of validating/applying a transaction.
///
/// Tokens and codes are stable for this implementation; wire
/// compatibility with the reference network is explicitly not a goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineResult {
    TesSuccess,
    TemBadFee,
    TemBadAmount,
    TemRedundant,
    TemUnknown,
    TecNoAccount,
    TecBadSequence,
    TecUnfunded,
    TecNoDstInsufXrp,
    TecInsufficientReserve,
}

impl EngineResult {
    /// Stable token, e.g. `tesSUCCESS`. `temUNKNOWN` covers recognized
    /// type ids with no implemented effect.
    pub fn token(&self) -> &'static str {
        match self {
            EngineResult::TesSuccess => "tesSUCCESS",
            EngineResult::TemBadFee => "temBAD_FEE",
            EngineResult::TemBadAmount => "temBAD_AMOUNT",
            EngineResult::TemRedundant => "temREDUNDANT",
            EngineResult::TemUnknown => "temUNKNOWN",
            EngineResult::TecNoAccount => "tecNO_ACCOUNT",
            EngineResult::TecBadSequence => "tecBAD_SEQUENCE",
            EngineResult::TecUnfunded => "tecUNFUNDED",
            EngineResult::TecNoDstInsufXrp => "tecNO_DST_INSUF_XRP",
            EngineResult::TecInsufficientReserve => "tecINSUFFICIENT_RESERVE",
        }
    }

    /// Numeric result code: 0 for success, negative `tem`, positive `tec`.
    pub fn code(&self) -> i32 {
        match self {
            EngineResult::TesSuccess => 0,
            EngineResult::TemBadFee => -273,
            EngineResult::TemBadAmount => -298,
            EngineResult::TemRedundant => -275,
            EngineResult::TemUnknown => -267,
            EngineResult::TecNoAccount => 125,
            EngineResult::TecBadSequence => 126,
            EngineResult::TecUnfunded => 104,
            EngineResult::TecNoDstInsufXrp => 127,
            EngineResult::TecInsufficientReserve => 141,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, EngineResult::TesSuccess)
    }
}

/// Outcome of applying one transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Canonical transaction hash.
    pub tx_hash: Hash256,
    /// Engine result; `tesSUCCESS` iff the state mutation committed.
    pub result: EngineResult,
    /// Fee actually debited (zero when nothing committed).
    pub fee_charged: Drops,
}

/// Validates a transaction against current state without mutating it.
///
/// Check order: account existence, sequence equality, fee floor, then
/// type-specific field checks.
pub fn validate(
    tx: &Transaction,
    state: &AccountState,
    fees: &FeeConfig,
) -> Result<(), EngineResult> {
    // A transaction the engine cannot interpret fails before any
    // account-state check.
    if let TxPayload::Unsupported { .. } = tx.payload {
        return Err(EngineResult::TemUnknown);
    }

    let account = state
        .get(&tx.account)
        .ok_or(EngineResult::TecNoAccount)?;

    if tx.sequence != account.sequence {
        return Err(EngineResult::TecBadSequence);
    }
    if tx.fee < fees.base_fee {
        return Err(EngineResult::TemBadFee);
    }

    match &tx.payload {
        TxPayload::Payment {
            destination,
            amount,
        } => {
            if amount.0 == 0 {
                return Err(EngineResult::TemBadAmount);
            }
            if *destination == tx.account {
                return Err(EngineResult::TemRedundant);
            }
        }
        TxPayload::EscrowCreate { amount, .. }
        | TxPayload::PaymentChannelCreate { amount, .. } => {
            if amount.0 == 0 {
                return Err(EngineResult::TemBadAmount);
            }
        }
        _ => {}
    }

    Ok(())
}

/// Applies a transaction to state, atomically.
///
/// On success the sender's sequence advances by one, the fee is debited,
/// the type-specific effect lands, and `previous_txn_id`/`lgr_seq` are
/// stamped. On failure state is unchanged and the receipt carries the
/// failure result.
pub fn apply(
    state: &mut AccountState,
    tx: &Transaction,
    fees: &FeeConfig,
    ledger_seq: LedgerSeq,
) -> Receipt {
    let tx_hash = tx.hash();

    if let Err(result) = validate(tx, state, fees) {
        return Receipt {
            tx_hash,
            result,
            fee_charged: Drops::ZERO,
        };
    }

    // Stage against copies; nothing is written back until every check
    // has passed.
    let mut sender = match state.get(&tx.account) {
        Some(account) => account.clone(),
        None => {
            return Receipt {
                tx_hash,
                result: EngineResult::TecNoAccount,
                fee_charged: Drops::ZERO,
            };
        }
    };

    let outgoing = match &tx.payload {
        TxPayload::Payment { amount, .. } => *amount,
        TxPayload::EscrowCreate { amount, .. } => *amount,
        TxPayload::PaymentChannelCreate { amount, .. } => *amount,
        _ => Drops::ZERO,
    };

    let debit = match tx.fee.checked_add(outgoing) {
        Some(d) => d,
        None => {
            return Receipt {
                tx_hash,
                result: EngineResult::TecUnfunded,
                fee_charged: Drops::ZERO,
            };
        }
    };

    sender.balance = match sender.balance.checked_sub(debit) {
        Some(b) => b,
        None => {
            return Receipt {
                tx_hash,
                result: EngineResult::TecUnfunded,
                fee_charged: Drops::ZERO,
            };
        }
    };

    // Type-specific effect. Destination mutations stage alongside the
    // sender and commit together.
    let mut destination_update: Option<Account> = None;
    match &tx.payload {
        TxPayload::Payment {
            destination,
            amount,
        } => match state.get(destination) {
            Some(existing) => {
                let mut dest = existing.clone();
                dest.balance = match dest.balance.checked_add(*amount) {
                    Some(b) => b,
                    None => {
                        return Receipt {
                            tx_hash,
                            result: EngineResult::TemBadAmount,
                            fee_charged: Drops::ZERO,
                        };
                    }
                };
                destination_update = Some(dest);
            }
            None => {
                // First funding creates the account, but only above the
                // base reserve.
                if *amount < fees.base_reserve {
                    return Receipt {
                        tx_hash,
                        result: EngineResult::TecNoDstInsufXrp,
                        fee_charged: Drops::ZERO,
                    };
                }
                destination_update = Some(Account::new(*destination, *amount));
            }
        },
        TxPayload::AccountSet => {}
        // Unreachable: validate already rejected unsupported payloads.
        TxPayload::Unsupported { .. } => {}
        TxPayload::OfferCancel { .. } => {
            sender.owner_count = sender.owner_count.saturating_sub(1);
        }
        TxPayload::OfferCreate { .. }
        | TxPayload::CheckCreate { .. }
        | TxPayload::TrustSet { .. }
        | TxPayload::EscrowCreate { .. }
        | TxPayload::PaymentChannelCreate { .. } => {
            sender.owner_count += 1;
        }
    }

    if sender.balance < fees.reserve(sender.owner_count) {
        return Receipt {
            tx_hash,
            result: EngineResult::TecInsufficientReserve,
            fee_charged: Drops::ZERO,
        };
    }

    sender.sequence += 1;
    sender.previous_txn_id = tx_hash;
    sender.previous_txn_lgr_seq = ledger_seq;

    state.insert(sender);
    if let Some(mut dest) = destination_update {
        dest.previous_txn_id = tx_hash;
        dest.previous_txn_lgr_seq = ledger_seq;
        state.insert(dest);
    }

    Receipt {
        tx_hash,
        result: EngineResult::TesSuccess,
        fee_charged: tx.fee,
    }
}

/// Sorts transactions into canonical application order:
/// by account id bytes, then sequence, then transaction hash.
pub fn canonical_order(txs: &mut [Transaction]) {
    txs.sort_by(|a, b| {
        a.account
            .cmp(&b.account)
            .then(a.sequence.cmp(&b.sequence))
            .then_with(|| a.hash().cmp(&b.hash()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ACCOUNT_ID_LEN, AccountId, DROPS_PER_XRP};

    fn dummy_account_id(byte: u8) -> AccountId {
        AccountId([byte; ACCOUNT_ID_LEN])
    }

    fn funded_state(byte: u8, xrp: u64, sequence: u32) -> AccountState {
        let mut state = AccountState::new();
        let mut acct = Account::new(dummy_account_id(byte), Drops(xrp * DROPS_PER_XRP));
        acct.sequence = sequence;
        state.insert(acct);
        state
    }

    fn account_set(byte: u8, fee: u64, sequence: u32) -> Transaction {
        Transaction {
            account: dummy_account_id(byte),
            fee: Drops(fee),
            sequence,
            payload: TxPayload::AccountSet,
        }
    }

    #[test]
    fn accountset_debits_fee_and_bumps_sequence() {
        // Account 0x01..01 with 1000 XRP at sequence 5; AccountSet with
        // fee 10 at sequence 5 must succeed and leave sequence 6.
        let fees = FeeConfig::default();
        let mut state = funded_state(1, 1_000, 5);
        let tx = account_set(1, 10, 5);

        let receipt = apply(&mut state, &tx, &fees, 3);

        assert_eq!(receipt.result, EngineResult::TesSuccess);
        assert_eq!(receipt.fee_charged, Drops(10));

        let acct = state.get(&dummy_account_id(1)).unwrap();
        assert_eq!(acct.sequence, 6);
        assert_eq!(acct.balance, Drops(1_000 * DROPS_PER_XRP - 10));
        assert_eq!(acct.previous_txn_id, tx.hash());
        assert_eq!(acct.previous_txn_lgr_seq, 3);
    }

    #[test]
    fn duplicate_sequence_fails_and_leaves_state_unchanged() {
        let fees = FeeConfig::default();
        let mut state = funded_state(1, 1_000, 5);
        let tx = account_set(1, 10, 5);

        assert!(apply(&mut state, &tx, &fees, 3).result.is_success());
        let snapshot = state.clone();

        let replay = apply(&mut state, &tx, &fees, 3);
        assert_eq!(replay.result, EngineResult::TecBadSequence);
        assert_eq!(replay.fee_charged, Drops::ZERO);
        assert_eq!(state, snapshot);
    }

    #[test]
    fn unknown_sender_is_rejected() {
        let fees = FeeConfig::default();
        let mut state = AccountState::new();
        let receipt = apply(&mut state, &account_set(9, 10, 1), &fees, 1);

        assert_eq!(receipt.result, EngineResult::TecNoAccount);
        assert!(state.is_empty());
    }

    #[test]
    fn fee_below_base_is_rejected() {
        let fees = FeeConfig::default();
        let mut state = funded_state(1, 1_000, 1);
        let receipt = apply(&mut state, &account_set(1, 5, 1), &fees, 1);

        assert_eq!(receipt.result, EngineResult::TemBadFee);
    }

    #[test]
    fn payment_moves_drops_between_existing_accounts() {
        let fees = FeeConfig::default();
        let mut state = funded_state(1, 1_000, 1);
        state.insert(Account::new(dummy_account_id(2), Drops(50 * DROPS_PER_XRP)));

        let tx = Transaction {
            account: dummy_account_id(1),
            fee: Drops(10),
            sequence: 1,
            payload: TxPayload::Payment {
                destination: dummy_account_id(2),
                amount: Drops(25 * DROPS_PER_XRP),
            },
        };

        let receipt = apply(&mut state, &tx, &fees, 7);
        assert_eq!(receipt.result, EngineResult::TesSuccess);

        assert_eq!(
            state.get(&dummy_account_id(1)).unwrap().balance,
            Drops(975 * DROPS_PER_XRP - 10)
        );
        assert_eq!(
            state.get(&dummy_account_id(2)).unwrap().balance,
            Drops(75 * DROPS_PER_XRP)
        );
    }

    #[test]
    fn payment_creates_destination_at_or_above_base_reserve() {
        let fees = FeeConfig::default();
        let mut state = funded_state(1, 1_000, 1);

        let underfunded = Transaction {
            account: dummy_account_id(1),
            fee: Drops(10),
            sequence: 1,
            payload: TxPayload::Payment {
                destination: dummy_account_id(3),
                amount: Drops(DROPS_PER_XRP),
            },
        };
        let receipt = apply(&mut state, &underfunded, &fees, 2);
        assert_eq!(receipt.result, EngineResult::TecNoDstInsufXrp);
        assert!(state.get(&dummy_account_id(3)).is_none());

        let funding = Transaction {
            payload: TxPayload::Payment {
                destination: dummy_account_id(3),
                amount: fees.base_reserve,
            },
            ..underfunded
        };
        let receipt = apply(&mut state, &funding, &fees, 2);
        assert_eq!(receipt.result, EngineResult::TesSuccess);

        let created = state.get(&dummy_account_id(3)).unwrap();
        assert_eq!(created.balance, fees.base_reserve);
        assert_eq!(created.sequence, 1);
    }

    #[test]
    fn overspending_payment_is_unfunded() {
        let fees = FeeConfig::default();
        let mut state = funded_state(1, 20, 1);
        state.insert(Account::new(dummy_account_id(2), Drops(50 * DROPS_PER_XRP)));

        let tx = Transaction {
            account: dummy_account_id(1),
            fee: Drops(10),
            sequence: 1,
            payload: TxPayload::Payment {
                destination: dummy_account_id(2),
                amount: Drops(100 * DROPS_PER_XRP),
            },
        };

        assert_eq!(apply(&mut state, &tx, &fees, 1).result, EngineResult::TecUnfunded);
    }

    #[test]
    fn owner_objects_raise_the_reserve_floor() {
        let fees = FeeConfig::default();
        // 12 XRP: enough for the base reserve, not for base + one object.
        let mut state = funded_state(1, 12, 1);

        let offer = Transaction {
            account: dummy_account_id(1),
            fee: Drops(10),
            sequence: 1,
            payload: TxPayload::OfferCreate {
                taker_pays: Drops(1),
                taker_gets: Drops(1),
            },
        };

        let receipt = apply(&mut state, &offer, &fees, 1);
        assert_eq!(receipt.result, EngineResult::TecInsufficientReserve);
        assert_eq!(state.get(&dummy_account_id(1)).unwrap().owner_count, 0);
    }

    #[test]
    fn offer_cancel_releases_an_owned_object() {
        let fees = FeeConfig::default();
        let mut state = funded_state(1, 100, 1);

        let create = Transaction {
            account: dummy_account_id(1),
            fee: Drops(10),
            sequence: 1,
            payload: TxPayload::OfferCreate {
                taker_pays: Drops(1),
                taker_gets: Drops(1),
            },
        };
        assert!(apply(&mut state, &create, &fees, 1).result.is_success());
        assert_eq!(state.get(&dummy_account_id(1)).unwrap().owner_count, 1);

        let cancel = Transaction {
            account: dummy_account_id(1),
            fee: Drops(10),
            sequence: 2,
            payload: TxPayload::OfferCancel { offer_sequence: 1 },
        };
        assert!(apply(&mut state, &cancel, &fees, 1).result.is_success());
        assert_eq!(state.get(&dummy_account_id(1)).unwrap().owner_count, 0);
    }

    #[test]
    fn zero_amount_payment_is_malformed() {
        let fees = FeeConfig::default();
        let state = funded_state(1, 100, 1);

        let tx = Transaction {
            account: dummy_account_id(1),
            fee: Drops(10),
            sequence: 1,
            payload: TxPayload::Payment {
                destination: dummy_account_id(2),
                amount: Drops::ZERO,
            },
        };

        assert_eq!(validate(&tx, &state, &fees), Err(EngineResult::TemBadAmount));
    }

    #[test]
    fn reserved_type_fails_with_tem_unknown() {
        let fees = FeeConfig::default();
        let mut state = funded_state(1, 100, 1);

        let tx = Transaction {
            account: dummy_account_id(1),
            fee: Drops(10),
            sequence: 1,
            payload: TxPayload::Unsupported { tx_type_id: 17 },
        };

        let receipt = apply(&mut state, &tx, &fees, 1);
        assert_eq!(receipt.result, EngineResult::TemUnknown);
        assert_eq!(receipt.result.code(), -267);
        assert_eq!(state.get(&dummy_account_id(1)).unwrap().sequence, 1);
    }

    #[test]
    fn self_payment_is_redundant() {
        let fees = FeeConfig::default();
        let mut state = funded_state(1, 100, 1);

        let tx = Transaction {
            account: dummy_account_id(1),
            fee: Drops(10),
            sequence: 1,
            payload: TxPayload::Payment {
                destination: dummy_account_id(1),
                amount: Drops(DROPS_PER_XRP),
            },
        };

        let receipt = apply(&mut state, &tx, &fees, 1);
        assert_eq!(receipt.result, EngineResult::TemRedundant);
        assert_eq!(state.get(&dummy_account_id(1)).unwrap().sequence, 1);
    }

    #[test]
    fn canonical_order_sorts_by_account_then_sequence() {
        let mut txs = vec![
            account_set(2, 10, 1),
            account_set(1, 10, 2),
            account_set(1, 10, 1),
        ];
        canonical_order(&mut txs);

        assert_eq!(txs[0].account, dummy_account_id(1));
        assert_eq!(txs[0].sequence, 1);
        assert_eq!(txs[1].account, dummy_account_id(1));
        assert_eq!(txs[1].sequence, 2);
        assert_eq!(txs[2].account, dummy_account_id(2));
    }

    #[test]
    fn engine_result_tokens_are_stable() {
        assert_eq!(EngineResult::TesSuccess.token(), "tesSUCCESS");
        assert_eq!(EngineResult::TesSuccess.code(), 0);
        assert_eq!(EngineResult::TemBadFee.code(), -273);
        assert_eq!(EngineResult::TecUnfunded.code(), 104);
    }
}
