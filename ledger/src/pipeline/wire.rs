//! Canonical transaction wire format.
//!
//! Every transaction travels as a fixed-length binary blob: a 34-byte
//! common header (`tx_type:u16 | account:20 | fee:u64 | sequence:u32`,
//! all big-endian) followed by type-specific trailing fields. Lengths are
//! strict in both directions: a blob whose length does not match the
//! table for its leading type id does not decode.

use serde::{Deserialize, Serialize};

use crate::crypto::sha512_half;
use crate::types::{ACCOUNT_ID_LEN, AccountId, Drops, Hash256};

use super::PipelineError;

/// Length of the common transaction header.
pub const HEADER_LEN: usize = 34;

/// Hash prefix for transaction identifiers (`TXN\0`).
const TXN_HASH_PREFIX: u32 = 0x5458_4E00;

/// Reference type ids that are recognized on the wire but carry no
/// implemented effect here (EscrowFinish, EscrowCancel, SetRegularKey,
/// PaymentChannelFund, PaymentChannelClaim, CheckCash, CheckCancel,
/// DepositPreauth, AccountDelete). They decode header-only and fail
/// validation with `temUNKNOWN`.
const RESERVED_TYPE_IDS: [u16; 9] = [2, 4, 5, 14, 15, 17, 18, 19, 21];

/// Transaction types and their wire ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxType {
    Payment,
    EscrowCreate,
    AccountSet,
    OfferCreate,
    OfferCancel,
    PaymentChannelCreate,
    CheckCreate,
    TrustSet,
    /// Recognized-but-unimplemented type id; header-only on the wire.
    Unsupported(u16),
}

impl TxType {
    /// Maps a wire id to a transaction type.
    pub fn from_u16(id: u16) -> Option<Self> {
        match id {
            0 => Some(TxType::Payment),
            1 => Some(TxType::EscrowCreate),
            3 => Some(TxType::AccountSet),
            7 => Some(TxType::OfferCreate),
            8 => Some(TxType::OfferCancel),
            13 => Some(TxType::PaymentChannelCreate),
            16 => Some(TxType::CheckCreate),
            20 => Some(TxType::TrustSet),
            _ if RESERVED_TYPE_IDS.contains(&id) => Some(TxType::Unsupported(id)),
            _ => None,
        }
    }

    /// Wire id of this type.
    pub fn as_u16(&self) -> u16 {
        match self {
            TxType::Payment => 0,
            TxType::EscrowCreate => 1,
            TxType::AccountSet => 3,
            TxType::OfferCreate => 7,
            TxType::OfferCancel => 8,
            TxType::PaymentChannelCreate => 13,
            TxType::CheckCreate => 16,
            TxType::TrustSet => 20,
            TxType::Unsupported(id) => *id,
        }
    }

    /// Exact blob length for this type, header included.
    pub fn expected_len(&self) -> usize {
        match self {
            TxType::Payment => HEADER_LEN + ACCOUNT_ID_LEN + 8,
            TxType::EscrowCreate => HEADER_LEN + 8 + 4,
            TxType::AccountSet => HEADER_LEN,
            TxType::OfferCreate => HEADER_LEN + 8 + 8,
            TxType::OfferCancel => HEADER_LEN + 4,
            TxType::PaymentChannelCreate => HEADER_LEN + ACCOUNT_ID_LEN + 8 + 4,
            TxType::CheckCreate => HEADER_LEN + ACCOUNT_ID_LEN + 8,
            TxType::TrustSet => HEADER_LEN + ACCOUNT_ID_LEN + ACCOUNT_ID_LEN + 8,
            TxType::Unsupported(_) => HEADER_LEN,
        }
    }

    /// Canonical name, as reported in `tx_json.TransactionType`.
    pub fn name(&self) -> &'static str {
        match self {
            TxType::Payment => "Payment",
            TxType::EscrowCreate => "EscrowCreate",
            TxType::AccountSet => "AccountSet",
            TxType::OfferCreate => "OfferCreate",
            TxType::OfferCancel => "OfferCancel",
            TxType::PaymentChannelCreate => "PaymentChannelCreate",
            TxType::CheckCreate => "CheckCreate",
            TxType::TrustSet => "TrustSet",
            TxType::Unsupported(_) => "Unknown",
        }
    }
}

/// Type-specific transaction payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxPayload {
    Payment {
        destination: AccountId,
        amount: Drops,
    },
    EscrowCreate {
        amount: Drops,
        finish_after: u32,
    },
    AccountSet,
    OfferCreate {
        taker_pays: Drops,
        taker_gets: Drops,
    },
    OfferCancel {
        offer_sequence: u32,
    },
    PaymentChannelCreate {
        destination: AccountId,
        amount: Drops,
        settle_delay: u32,
    },
    CheckCreate {
        destination: AccountId,
        send_max: Drops,
    },
    TrustSet {
        currency: [u8; ACCOUNT_ID_LEN],
        issuer: AccountId,
        limit: Drops,
    },
    /// Recognized type id with no implemented effect; rejected at
    /// validation with `temUNKNOWN`.
    Unsupported {
        tx_type_id: u16,
    },
}

/// A decoded transaction: common header plus typed payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub account: AccountId,
    pub fee: Drops,
    pub sequence: u32,
    pub payload: TxPayload,
}

impl Transaction {
    /// The wire type of this transaction.
    pub fn tx_type(&self) -> TxType {
        match self.payload {
            TxPayload::Payment { .. } => TxType::Payment,
            TxPayload::EscrowCreate { .. } => TxType::EscrowCreate,
            TxPayload::AccountSet => TxType::AccountSet,
            TxPayload::OfferCreate { .. } => TxType::OfferCreate,
            TxPayload::OfferCancel { .. } => TxType::OfferCancel,
            TxPayload::PaymentChannelCreate { .. } => TxType::PaymentChannelCreate,
            TxPayload::CheckCreate { .. } => TxType::CheckCreate,
            TxPayload::TrustSet { .. } => TxType::TrustSet,
            TxPayload::Unsupported { tx_type_id } => TxType::Unsupported(tx_type_id),
        }
    }

    /// Serializes this transaction into its canonical blob.
    pub fn encode(&self) -> Vec<u8> {
        let ty = self.tx_type();
        let mut buf = Vec::with_capacity(ty.expected_len());
        buf.extend_from_slice(&ty.as_u16().to_be_bytes());
        buf.extend_from_slice(self.account.as_bytes());
        buf.extend_from_slice(&self.fee.0.to_be_bytes());
        buf.extend_from_slice(&self.sequence.to_be_bytes());

        match &self.payload {
            TxPayload::Payment {
                destination,
                amount,
            } => {
                buf.extend_from_slice(destination.as_bytes());
                buf.extend_from_slice(&amount.0.to_be_bytes());
            }
            TxPayload::EscrowCreate {
                amount,
                finish_after,
            } => {
                buf.extend_from_slice(&amount.0.to_be_bytes());
                buf.extend_from_slice(&finish_after.to_be_bytes());
            }
            TxPayload::AccountSet => {}
            TxPayload::OfferCreate {
                taker_pays,
                taker_gets,
            } => {
                buf.extend_from_slice(&taker_pays.0.to_be_bytes());
                buf.extend_from_slice(&taker_gets.0.to_be_bytes());
            }
            TxPayload::OfferCancel { offer_sequence } => {
                buf.extend_from_slice(&offer_sequence.to_be_bytes());
            }
            TxPayload::PaymentChannelCreate {
                destination,
                amount,
                settle_delay,
            } => {
                buf.extend_from_slice(destination.as_bytes());
                buf.extend_from_slice(&amount.0.to_be_bytes());
                buf.extend_from_slice(&settle_delay.to_be_bytes());
            }
            TxPayload::CheckCreate {
                destination,
                send_max,
            } => {
                buf.extend_from_slice(destination.as_bytes());
                buf.extend_from_slice(&send_max.0.to_be_bytes());
            }
            TxPayload::TrustSet {
                currency,
                issuer,
                limit,
            } => {
                buf.extend_from_slice(currency);
                buf.extend_from_slice(issuer.as_bytes());
                buf.extend_from_slice(&limit.0.to_be_bytes());
            }
            TxPayload::Unsupported { .. } => {}
        }

        debug_assert_eq!(buf.len(), ty.expected_len());
        buf
    }

    /// Decodes a transaction from its canonical blob.
    ///
    /// Length-strict: short, long, and unknown-type blobs all fail with
    /// [`PipelineError::InvalidTxBlob`].
    pub fn decode(blob: &[u8]) -> Result<Self, PipelineError> {
        if blob.len() < 2 {
            return Err(PipelineError::InvalidTxBlob);
        }
        let ty = TxType::from_u16(u16::from_be_bytes([blob[0], blob[1]]))
            .ok_or(PipelineError::InvalidTxBlob)?;
        if blob.len() != ty.expected_len() {
            return Err(PipelineError::InvalidTxBlob);
        }

        let mut r = Reader::new(&blob[2..]);
        let account = AccountId(r.take_id());
        let fee = Drops(r.take_u64());
        let sequence = r.take_u32();

        let payload = match ty {
            TxType::Payment => TxPayload::Payment {
                destination: AccountId(r.take_id()),
                amount: Drops(r.take_u64()),
            },
            TxType::EscrowCreate => TxPayload::EscrowCreate {
                amount: Drops(r.take_u64()),
                finish_after: r.take_u32(),
            },
            TxType::AccountSet => TxPayload::AccountSet,
            TxType::OfferCreate => TxPayload::OfferCreate {
                taker_pays: Drops(r.take_u64()),
                taker_gets: Drops(r.take_u64()),
            },
            TxType::OfferCancel => TxPayload::OfferCancel {
                offer_sequence: r.take_u32(),
            },
            TxType::PaymentChannelCreate => TxPayload::PaymentChannelCreate {
                destination: AccountId(r.take_id()),
                amount: Drops(r.take_u64()),
                settle_delay: r.take_u32(),
            },
            TxType::CheckCreate => TxPayload::CheckCreate {
                destination: AccountId(r.take_id()),
                send_max: Drops(r.take_u64()),
            },
            TxType::TrustSet => TxPayload::TrustSet {
                currency: r.take_id(),
                issuer: AccountId(r.take_id()),
                limit: Drops(r.take_u64()),
            },
            TxType::Unsupported(tx_type_id) => TxPayload::Unsupported { tx_type_id },
        };

        Ok(Transaction {
            account,
            fee,
            sequence,
            payload,
        })
    }

    /// Canonical transaction identifier:
    /// `sha512_half(TXN-prefix ‖ blob)`.
    pub fn hash(&self) -> Hash256 {
        let blob = self.encode();
        let mut buf = Vec::with_capacity(4 + blob.len());
        buf.extend_from_slice(&TXN_HASH_PREFIX.to_be_bytes());
        buf.extend_from_slice(&blob);
        sha512_half(&buf)
    }
}

/// Cursor over a length-checked payload. All reads are in-bounds because
/// `decode` verified the exact blob length first.
struct Reader<'a> {
    buf: &'a [u8],
    off: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, off: 0 }
    }

    fn take_id(&mut self) -> [u8; ACCOUNT_ID_LEN] {
        let mut arr = [0u8; ACCOUNT_ID_LEN];
        arr.copy_from_slice(&self.buf[self.off..self.off + ACCOUNT_ID_LEN]);
        self.off += ACCOUNT_ID_LEN;
        arr
    }

    fn take_u64(&mut self) -> u64 {
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&self.buf[self.off..self.off + 8]);
        self.off += 8;
        u64::from_be_bytes(arr)
    }

    fn take_u32(&mut self) -> u32 {
        let mut arr = [0u8; 4];
        arr.copy_from_slice(&self.buf[self.off..self.off + 4]);
        self.off += 4;
        u32::from_be_bytes(arr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_account(byte: u8) -> AccountId {
        AccountId([byte; ACCOUNT_ID_LEN])
    }

    fn sample_transactions() -> Vec<Transaction> {
        let account = dummy_account(1);
        let destination = dummy_account(2);
        vec![
            Transaction {
                account,
                fee: Drops(10),
                sequence: 4,
                payload: TxPayload::Payment {
                    destination,
                    amount: Drops(25_000_000),
                },
            },
            Transaction {
                account,
                fee: Drops(10),
                sequence: 5,
                payload: TxPayload::EscrowCreate {
                    amount: Drops(1_000),
                    finish_after: 600,
                },
            },
            Transaction {
                account,
                fee: Drops(12),
                sequence: 6,
                payload: TxPayload::AccountSet,
            },
            Transaction {
                account,
                fee: Drops(10),
                sequence: 7,
                payload: TxPayload::OfferCreate {
                    taker_pays: Drops(500),
                    taker_gets: Drops(700),
                },
            },
            Transaction {
                account,
                fee: Drops(10),
                sequence: 8,
                payload: TxPayload::OfferCancel { offer_sequence: 7 },
            },
            Transaction {
                account,
                fee: Drops(10),
                sequence: 9,
                payload: TxPayload::PaymentChannelCreate {
                    destination,
                    amount: Drops(42),
                    settle_delay: 3_600,
                },
            },
            Transaction {
                account,
                fee: Drops(10),
                sequence: 10,
                payload: TxPayload::CheckCreate {
                    destination,
                    send_max: Drops(99),
                },
            },
            Transaction {
                account,
                fee: Drops(10),
                sequence: 11,
                payload: TxPayload::TrustSet {
                    currency: *b"USD\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0",
                    issuer: destination,
                    limit: Drops(1_000_000),
                },
            },
        ]
    }

    #[test]
    fn every_type_roundtrips() {
        for tx in sample_transactions() {
            let blob = tx.encode();
            assert_eq!(blob.len(), tx.tx_type().expected_len());

            let decoded = Transaction::decode(&blob).expect("canonical blob should decode");
            assert_eq!(decoded, tx);
        }
    }

    #[test]
    fn short_and_long_blobs_are_rejected() {
        for tx in sample_transactions() {
            let blob = tx.encode();

            let short = &blob[..blob.len() - 1];
            assert_eq!(Transaction::decode(short), Err(PipelineError::InvalidTxBlob));

            let mut long = blob.clone();
            long.push(0);
            assert_eq!(Transaction::decode(&long), Err(PipelineError::InvalidTxBlob));
        }
    }

    #[test]
    fn unknown_type_id_is_rejected() {
        let mut blob = vec![0u8; HEADER_LEN];
        blob[0] = 0xFF;
        blob[1] = 0xFF;
        assert_eq!(Transaction::decode(&blob), Err(PipelineError::InvalidTxBlob));
    }

    #[test]
    fn reserved_type_ids_decode_header_only() {
        // CheckCash (17) is recognized but unimplemented.
        let tx = Transaction {
            account: dummy_account(3),
            fee: Drops(10),
            sequence: 9,
            payload: TxPayload::Unsupported { tx_type_id: 17 },
        };
        let blob = tx.encode();
        assert_eq!(blob.len(), HEADER_LEN);
        assert_eq!(&blob[..2], &17u16.to_be_bytes());

        let decoded = Transaction::decode(&blob).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.tx_type(), TxType::Unsupported(17));
        assert_eq!(decoded.tx_type().name(), "Unknown");

        // Length stays strict for reserved ids too.
        let mut long = blob.clone();
        long.push(0);
        assert_eq!(Transaction::decode(&long), Err(PipelineError::InvalidTxBlob));
    }

    #[test]
    fn empty_blob_is_rejected() {
        assert_eq!(Transaction::decode(&[]), Err(PipelineError::InvalidTxBlob));
        assert_eq!(Transaction::decode(&[0]), Err(PipelineError::InvalidTxBlob));
    }

    #[test]
    fn distinct_blobs_hash_distinctly() {
        let txs = sample_transactions();
        let mut hashes: Vec<_> = txs.iter().map(|tx| tx.hash()).collect();
        hashes.sort();
        hashes.dedup();
        assert_eq!(hashes.len(), txs.len());
    }

    #[test]
    fn accountset_header_layout_is_exact() {
        // 0003 | account | fee | sequence, all big-endian.
        let tx = Transaction {
            account: dummy_account(0x01),
            fee: Drops(10),
            sequence: 5,
            payload: TxPayload::AccountSet,
        };
        let blob = tx.encode();

        assert_eq!(blob.len(), 34);
        assert_eq!(&blob[..2], &[0x00, 0x03]);
        assert_eq!(&blob[2..22], &[0x01; 20]);
        assert_eq!(&blob[22..30], &10u64.to_be_bytes());
        assert_eq!(&blob[30..34], &5u32.to_be_bytes());
    }
}
