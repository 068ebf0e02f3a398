//! Crypto evidence fixtures and their gate (Gate C).
//!
//! The evidence fixture records signature vectors produced by the crypto
//! kernel: positive vectors, signing-domain checks, and negative
//! controls. The gate re-verifies every vector through the kernel and
//! enforces the evidence floors: at least three positives, three domain
//! checks, and (in strict mode) three negatives.

use serde::{Deserialize, Serialize};

use crate::crypto::{self, Keypair, SigningDomain};

/// File name of the crypto evidence fixture.
pub const CRYPTO_EVIDENCE: &str = "crypto-evidence.json";

/// Minimum vectors per category.
pub const EVIDENCE_FLOOR: usize = 3;

/// One recorded signature check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureVector {
    pub name: String,
    pub domain: SigningDomain,
    pub public_key: String,
    pub message: String,
    pub signature: String,
    /// What the kernel is expected to say about this vector.
    pub expect_valid: bool,
}

/// The full evidence fixture.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoEvidence {
    pub schema_version: u32,
    pub seed: String,
    pub positive_vectors: Vec<SignatureVector>,
    pub domain_checks: Vec<SignatureVector>,
    pub negative_vectors: Vec<SignatureVector>,
}

fn seed_bytes(seed: &str, index: u8) -> [u8; crypto::KEY_LEN] {
    let mut material = Vec::with_capacity(seed.len() + 1);
    material.extend_from_slice(seed.as_bytes());
    material.push(index);
    *crypto::sha512_half(&material).as_bytes()
}

fn vector(
    name: &str,
    keypair: &Keypair,
    domain: SigningDomain,
    message: &[u8],
    expect_valid: bool,
) -> SignatureVector {
    SignatureVector {
        name: name.to_string(),
        domain,
        public_key: hex::encode_upper(keypair.public_key()),
        message: hex::encode_upper(message),
        signature: hex::encode_upper(keypair.sign(domain, message)),
        expect_valid,
    }
}

/// Generates the evidence fixture deterministically from `seed`.
pub fn generate(seed: &str) -> CryptoEvidence {
    let keys: Vec<Keypair> = (0..4u8)
        .map(|i| Keypair::from_seed(&seed_bytes(seed, i)))
        .collect();

    let positive_vectors = vec![
        vector("sign-verify-tx", &keys[0], SigningDomain::Transaction, b"payment blob", true),
        vector("sign-verify-val", &keys[1], SigningDomain::Validation, b"ledger validation", true),
        vector("sign-verify-prp", &keys[2], SigningDomain::Proposal, b"round position", true),
    ];

    let domain_checks = vec![
        vector("domain-tx", &keys[0], SigningDomain::Transaction, b"domain bound", true),
        vector("domain-val", &keys[0], SigningDomain::Validation, b"domain bound", true),
        vector("domain-prp", &keys[0], SigningDomain::Proposal, b"domain bound", true),
    ];

    // Negative controls: tampered message, wrong key, wrong domain.
    let mut tampered = vector(
        "tampered-message",
        &keys[0],
        SigningDomain::Transaction,
        b"authentic bytes",
        false,
    );
    tampered.message = hex::encode_upper(b"tampered  bytes");

    let mut wrong_key = vector(
        "wrong-key",
        &keys[1],
        SigningDomain::Transaction,
        b"key swap",
        false,
    );
    wrong_key.public_key = hex::encode_upper(keys[3].public_key());

    let mut wrong_domain = vector(
        "wrong-domain",
        &keys[2],
        SigningDomain::Proposal,
        b"cross domain",
        false,
    );
    wrong_domain.domain = SigningDomain::Validation;

    CryptoEvidence {
        schema_version: 1,
        seed: seed.to_string(),
        positive_vectors,
        domain_checks,
        negative_vectors: vec![tampered, wrong_key, wrong_domain],
    }
}

fn verify_vector(v: &SignatureVector) -> Result<(), String> {
    let public_key = hex::decode(&v.public_key)
        .map_err(|_| format!("vector {}: bad public key hex", v.name))?;
    let message =
        hex::decode(&v.message).map_err(|_| format!("vector {}: bad message hex", v.name))?;
    let signature =
        hex::decode(&v.signature).map_err(|_| format!("vector {}: bad signature hex", v.name))?;

    let valid = crypto::ed25519_verify(&public_key, v.domain, &message, &signature).is_ok();
    if valid != v.expect_valid {
        return Err(format!(
            "vector {}: kernel said valid={valid}, fixture pinned {}",
            v.name, v.expect_valid
        ));
    }
    Ok(())
}

/// Checks a domain vector's binding: it must verify under its declared
/// domain and fail under every other domain.
fn verify_domain_binding(v: &SignatureVector) -> Result<(), String> {
    verify_vector(v)?;

    let public_key = hex::decode(&v.public_key).map_err(|_| "bad hex".to_string())?;
    let message = hex::decode(&v.message).map_err(|_| "bad hex".to_string())?;
    let signature = hex::decode(&v.signature).map_err(|_| "bad hex".to_string())?;

    for other in [
        SigningDomain::Transaction,
        SigningDomain::Validation,
        SigningDomain::Proposal,
    ] {
        if other == v.domain {
            continue;
        }
        if crypto::ed25519_verify(&public_key, other, &message, &signature).is_ok() {
            return Err(format!(
                "vector {}: signature leaked across signing domains",
                v.name
            ));
        }
    }
    Ok(())
}

/// Gate C: evidence floors plus full re-verification.
pub fn check(evidence: &CryptoEvidence, strict: bool) -> Result<(), String> {
    if evidence.positive_vectors.len() < EVIDENCE_FLOOR {
        return Err(format!(
            "need >= {EVIDENCE_FLOOR} positive vectors, got {}",
            evidence.positive_vectors.len()
        ));
    }
    if evidence.domain_checks.len() < EVIDENCE_FLOOR {
        return Err(format!(
            "need >= {EVIDENCE_FLOOR} signing-domain checks, got {}",
            evidence.domain_checks.len()
        ));
    }
    if strict && evidence.negative_vectors.len() < EVIDENCE_FLOOR {
        return Err(format!(
            "strict mode needs >= {EVIDENCE_FLOOR} negative vectors, got {}",
            evidence.negative_vectors.len()
        ));
    }

    for v in &evidence.positive_vectors {
        verify_vector(v)?;
    }
    for v in &evidence.domain_checks {
        verify_domain_binding(v)?;
    }
    for v in &evidence.negative_vectors {
        if v.expect_valid {
            return Err(format!("vector {}: negative vector pinned as valid", v.name));
        }
        verify_vector(v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_evidence_passes_strict_check() {
        let evidence = generate("xrpl-agent-lab-v1");
        check(&evidence, true).unwrap();
    }

    #[test]
    fn generation_is_deterministic() {
        let a = generate("seed-a");
        let b = generate("seed-a");
        assert_eq!(a, b);
        assert_ne!(a, generate("seed-b"));
    }

    #[test]
    fn floors_are_enforced() {
        let mut evidence = generate("s");
        evidence.positive_vectors.pop();
        let err = check(&evidence, false).unwrap_err();
        assert!(err.contains("positive vectors"));

        let mut evidence = generate("s");
        evidence.negative_vectors.clear();
        // Relaxed mode tolerates missing negatives; strict does not.
        check(&evidence, false).unwrap();
        let err = check(&evidence, true).unwrap_err();
        assert!(err.contains("negative vectors"));
    }

    #[test]
    fn forged_positive_vector_is_caught() {
        let mut evidence = generate("s");
        evidence.positive_vectors[0].message = hex::encode_upper(b"forged");

        let err = check(&evidence, true).unwrap_err();
        assert!(err.contains("kernel said valid=false"));
    }

    #[test]
    fn negative_vectors_must_fail_verification() {
        let mut evidence = generate("s");
        // Flip a negative's expectation: the kernel disagrees.
        evidence.negative_vectors[0].expect_valid = true;

        let err = check(&evidence, true).unwrap_err();
        assert!(err.contains("negative vector pinned as valid"));
    }
}
