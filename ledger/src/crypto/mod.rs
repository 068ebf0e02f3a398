//! Crypto kernel: hashing and signature primitives.
//!
//! Everything the ledger hashes goes through [`sha512_half`]; account
//! identifiers are derived with [`account_id_from_pubkey`]. Signatures are
//! Ed25519 by default; ECDSA over secp256k1 is compiled in only when the
//! `secp256k1` cargo feature is enabled, and fails with
//! [`CryptoError::CryptoUnavailable`] otherwise.
//!
//! All signing binds a [`SigningDomain`]: the 4-byte domain prefix is
//! prepended to the message before signing, so a transaction signature can
//! never validate as a proposal signature and vice versa.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;

use crate::types::{ACCOUNT_ID_LEN, AccountId, HASH_LEN, Hash256};

/// Length of an Ed25519 seed and public key.
pub const KEY_LEN: usize = 32;

/// Length of an Ed25519 or compact ECDSA signature.
pub const SIGNATURE_LEN: usize = 64;

/// Errors from the crypto kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("malformed public key")]
    InvalidKey,
    #[error("malformed signature encoding")]
    InvalidSignature,
    #[error("signature verification failed")]
    BadSignature,
    #[error("CryptoUnavailable")]
    CryptoUnavailable,
}

/// Domain a signature is bound to.
///
/// Prefix constants follow the reference hash-prefix convention:
/// ASCII tag plus a trailing zero byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SigningDomain {
    /// Transaction signing (`STX\0`).
    Transaction,
    /// Validator ledger validations (`VAL\0`).
    Validation,
    /// Consensus proposals (`PRP\0`).
    Proposal,
}

impl SigningDomain {
    /// The 4-byte prefix bound into every signature of this domain.
    pub fn prefix(&self) -> [u8; 4] {
        match self {
            SigningDomain::Transaction => 0x5354_5800u32.to_be_bytes(),
            SigningDomain::Validation => 0x5641_4C00u32.to_be_bytes(),
            SigningDomain::Proposal => 0x5052_5000u32.to_be_bytes(),
        }
    }

    fn bind(&self, message: &[u8]) -> Vec<u8> {
        let mut bound = Vec::with_capacity(4 + message.len());
        bound.extend_from_slice(&self.prefix());
        bound.extend_from_slice(message);
        bound
    }
}

/// SHA-256 digest.
pub fn sha256(data: &[u8]) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-512 "half": the first 32 bytes of a SHA-512 digest.
///
/// This is the ledger's canonical 256-bit hash for headers, transaction
/// identifiers, and state roots.
pub fn sha512_half(data: &[u8]) -> Hash256 {
    let mut hasher = Sha512::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut half = [0u8; HASH_LEN];
    half.copy_from_slice(&digest[..HASH_LEN]);
    Hash256(half)
}

/// RIPEMD-160 digest.
pub fn ripemd160(data: &[u8]) -> [u8; ACCOUNT_ID_LEN] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derives an account identifier from a public key:
/// `ripemd160(sha256(public_key))`.
pub fn account_id_from_pubkey(public_key: &[u8]) -> AccountId {
    AccountId(ripemd160(&sha256(public_key)))
}

/// An Ed25519 keypair held by a validator or a test wallet.
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    /// Derives a keypair deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; KEY_LEN]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    /// Returns the 32-byte public key.
    pub fn public_key(&self) -> [u8; KEY_LEN] {
        self.signing.verifying_key().to_bytes()
    }

    /// The account identifier owned by this keypair.
    pub fn account_id(&self) -> AccountId {
        account_id_from_pubkey(&self.public_key())
    }

    /// Signs `message` bound to `domain`.
    pub fn sign(&self, domain: SigningDomain, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.signing.sign(&domain.bind(message)).to_bytes()
    }
}

/// Verifies an Ed25519 signature over `message` bound to `domain`.
pub fn ed25519_verify(
    public_key: &[u8],
    domain: SigningDomain,
    message: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    let pk_bytes: [u8; KEY_LEN] = public_key.try_into().map_err(|_| CryptoError::InvalidKey)?;
    let key = VerifyingKey::from_bytes(&pk_bytes).map_err(|_| CryptoError::InvalidKey)?;
    let sig_bytes: [u8; SIGNATURE_LEN] = signature
        .try_into()
        .map_err(|_| CryptoError::InvalidSignature)?;
    let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);

    key.verify(&domain.bind(message), &sig)
        .map_err(|_| CryptoError::BadSignature)
}

/// Verifies a compact ECDSA (secp256k1) signature over the SHA-256 digest
/// of the domain-bound message.
#[cfg(feature = "secp256k1")]
pub fn ecdsa_verify(
    public_key: &[u8],
    domain: SigningDomain,
    message: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    use secp256k1::{Message, PublicKey, Secp256k1, ecdsa};

    let secp = Secp256k1::verification_only();
    let key = PublicKey::from_slice(public_key).map_err(|_| CryptoError::InvalidKey)?;
    let sig = ecdsa::Signature::from_compact(signature).map_err(|_| CryptoError::InvalidSignature)?;
    let digest = sha256(&domain.bind(message));
    let msg = Message::from_digest(digest);

    secp.verify_ecdsa(&msg, &sig, &key)
        .map_err(|_| CryptoError::BadSignature)
}

/// ECDSA verification stub used when the `secp256k1` feature is off.
///
/// Policy layers surface this as a validation failure rather than a panic,
/// so an ECDSA-signed input is rejected deterministically.
#[cfg(not(feature = "secp256k1"))]
pub fn ecdsa_verify(
    _public_key: &[u8],
    _domain: SigningDomain,
    _message: &[u8],
    _signature: &[u8],
) -> Result<(), CryptoError> {
    Err(CryptoError::CryptoUnavailable)
}

/// Whether ECDSA verification was compiled in.
pub fn ecdsa_available() -> bool {
    cfg!(feature = "secp256k1")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_keypair(byte: u8) -> Keypair {
        Keypair::from_seed(&[byte; KEY_LEN])
    }

    #[test]
    fn sha512_half_matches_known_vector() {
        // SHA-512("") starts with cf83e1357eefb8bd f1542850d66d8007
        // d620e4050b5715dc 83f4a921d36ce9ce ...
        let h = sha512_half(b"");
        assert_eq!(
            h.to_string(),
            "CF83E1357EEFB8BDF1542850D66D8007D620E4050B5715DC83F4A921D36CE9CE"
        );
    }

    #[test]
    fn account_id_derivation_is_stable() {
        let kp = test_keypair(1);
        let id1 = kp.account_id();
        let id2 = account_id_from_pubkey(&kp.public_key());
        assert_eq!(id1, id2);
        assert_ne!(id1, AccountId::default());
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let kp = test_keypair(2);
        let msg = b"an open ledger";
        let sig = kp.sign(SigningDomain::Transaction, msg);

        assert!(
            ed25519_verify(&kp.public_key(), SigningDomain::Transaction, msg, &sig).is_ok()
        );
    }

    #[test]
    fn tampered_message_fails() {
        let kp = test_keypair(3);
        let sig = kp.sign(SigningDomain::Transaction, b"original");

        let err = ed25519_verify(
            &kp.public_key(),
            SigningDomain::Transaction,
            b"0riginal",
            &sig,
        )
        .unwrap_err();
        assert_eq!(err, CryptoError::BadSignature);
    }

    #[test]
    fn wrong_key_fails() {
        let signer = test_keypair(4);
        let other = test_keypair(5);
        let sig = signer.sign(SigningDomain::Transaction, b"msg");

        let err = ed25519_verify(&other.public_key(), SigningDomain::Transaction, b"msg", &sig)
            .unwrap_err();
        assert_eq!(err, CryptoError::BadSignature);
    }

    #[test]
    fn wrong_signing_domain_fails() {
        let kp = test_keypair(6);
        let sig = kp.sign(SigningDomain::Proposal, b"position");

        let err = ed25519_verify(&kp.public_key(), SigningDomain::Validation, b"position", &sig)
            .unwrap_err();
        assert_eq!(err, CryptoError::BadSignature);
    }

    #[test]
    fn malformed_key_and_signature_are_detected() {
        let kp = test_keypair(7);
        let sig = kp.sign(SigningDomain::Transaction, b"msg");

        assert_eq!(
            ed25519_verify(&[0u8; 5], SigningDomain::Transaction, b"msg", &sig),
            Err(CryptoError::InvalidKey)
        );
        assert_eq!(
            ed25519_verify(&kp.public_key(), SigningDomain::Transaction, b"msg", &[1, 2, 3]),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[cfg(not(feature = "secp256k1"))]
    #[test]
    fn ecdsa_disabled_reports_crypto_unavailable() {
        let err = ecdsa_verify(&[2u8; 33], SigningDomain::Transaction, b"msg", &[0u8; 64])
            .unwrap_err();
        assert_eq!(err, CryptoError::CryptoUnavailable);
        assert!(!ecdsa_available());
    }
}
