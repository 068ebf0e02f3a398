//! Core domain types used by the ledger.
//!
//! This module defines strongly-typed hashes, account identifiers, drop
//! amounts, and the tagged [`Amount`] used across the ledger
//! implementation. The goal is to avoid "naked" byte buffers and bare
//! integers in public APIs and instead use domain-specific newtypes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod account;

pub use account::Account;

/// Length in bytes of all 256-bit hash types used by the ledger.
pub const HASH_LEN: usize = 32;

/// Length in bytes of an account identifier.
pub const ACCOUNT_ID_LEN: usize = 20;

/// Number of drops in one XRP.
pub const DROPS_PER_XRP: u64 = 1_000_000;

/// Ledger sequence number.
pub type LedgerSeq = u32;

/// Errors produced when parsing domain types from their textual forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("invalid hex encoding")]
    InvalidHex,
    #[error("wrong length for value")]
    WrongLength,
    #[error("drop amount overflow")]
    DropsOverflow,
}

/// Strongly-typed 256-bit hash wrapper (SHA-512 "half").
///
/// This is the backing representation for all fixed-size hashes in the
/// ledger: ledger hashes, transaction hashes, and state roots. It is
/// always exactly [`HASH_LEN`] bytes long. Ordering is plain byte-wise
/// ordering, which is what canonical tie-breaks rely on.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize, Default,
)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// The all-zero hash, used as the fold seed for state roots and as
    /// the parent of the genesis ledger.
    pub const ZERO: Hash256 = Hash256([0u8; HASH_LEN]);

    /// Returns the underlying 32-byte hash as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Parses a hash from a 64-character hex string, case-insensitively.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|_| TypeError::InvalidHex)?;
        if bytes.len() != HASH_LEN {
            return Err(TypeError::WrongLength);
        }
        let mut arr = [0u8; HASH_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Hash256(arr))
    }
}

impl fmt::Display for Hash256 {
    /// Uppercase hex, the canonical textual form for all emitted hashes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

/// Account identifier: RIPEMD-160 over SHA-256 of the public key.
///
/// Twenty bytes, compared byte-wise. The byte-wise `Ord` is load-bearing:
/// deterministic state iteration and canonical transaction ordering both
/// sort by raw account-id bytes.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize, Default,
)]
pub struct AccountId(pub [u8; ACCOUNT_ID_LEN]);

impl AccountId {
    /// Returns the underlying 20 bytes.
    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_LEN] {
        &self.0
    }

    /// Parses an account id from a 40-character hex string,
    /// case-insensitively.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|_| TypeError::InvalidHex)?;
        if bytes.len() != ACCOUNT_ID_LEN {
            return Err(TypeError::WrongLength);
        }
        let mut arr = [0u8; ACCOUNT_ID_LEN];
        arr.copy_from_slice(&bytes);
        Ok(AccountId(arr))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl FromStr for AccountId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, TypeError> {
        AccountId::from_hex(s)
    }
}

/// An amount of the native asset, in drops (1 XRP = 1,000,000 drops).
///
/// Arithmetic is checked: balances can never silently wrap.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize, Default,
)]
pub struct Drops(pub u64);

impl Drops {
    pub const ZERO: Drops = Drops(0);

    /// Constructs a drop amount from whole XRP.
    pub fn from_xrp(xrp: u64) -> Result<Self, TypeError> {
        xrp.checked_mul(DROPS_PER_XRP)
            .map(Drops)
            .ok_or(TypeError::DropsOverflow)
    }

    pub fn checked_add(self, other: Drops) -> Option<Drops> {
        self.0.checked_add(other.0).map(Drops)
    }

    pub fn checked_sub(self, other: Drops) -> Option<Drops> {
        self.0.checked_sub(other.0).map(Drops)
    }
}

impl fmt::Display for Drops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tagged amount: either native drops or an issued-currency value.
///
/// Issued values are a (mantissa, exponent) pair against a 20-byte
/// currency code and an issuing account. The ledger core only moves XRP;
/// issued amounts appear on trust lines and offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Amount {
    /// Native asset, denominated in drops.
    Xrp(Drops),
    /// Issued currency identified by code and issuer.
    Issued {
        currency: [u8; ACCOUNT_ID_LEN],
        issuer: AccountId,
        mantissa: i64,
        exponent: i8,
    },
}

impl Amount {
    /// Returns the drop value for native amounts, `None` for issued ones.
    pub fn native(&self) -> Option<Drops> {
        match self {
            Amount::Xrp(d) => Some(*d),
            Amount::Issued { .. } => None,
        }
    }
}
