//! Proof verification seam.
//!
//! The ledger never looks inside a proof. It hands the decoded statement and
//! the opaque proof bytes to a `ProofVerifier` and acts on the verdict.

use crate::statement::TransferStatement;
use crate::witness::Witness;

/// Contract of the external range-proof and sigma-protocol verifier.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, statement: &TransferStatement, proof: &[u8]) -> bool;
}

/// Mock verifier for development and tests.
///
/// A mock proof is a domain-separated hash of the canonical statement bytes,
/// so it binds to every public input but proves nothing about the witness.
pub struct MockVerifier {
    domain: [u8; 32],
}

impl MockVerifier {
    pub fn new() -> Self {
        Self {
            domain: *blake3::hash(b"umbra-mock-transfer-proof-v1").as_bytes(),
        }
    }

    /// Transcript bytes accepted for `statement`. Empty when the statement
    /// cannot be encoded.
    pub fn proof_for(&self, statement: &TransferStatement) -> Vec<u8> {
        match statement.encode() {
            Ok(bytes) => {
                let mut hasher = blake3::Hasher::new();
                hasher.update(&self.domain);
                hasher.update(&bytes);
                hasher.finalize().as_bytes().to_vec()
            }
            Err(_) => Vec::new(),
        }
    }

    /// Produces a mock proof when the witness matches the statement.
    pub fn prove(&self, statement: &TransferStatement, witness: &Witness) -> Option<Vec<u8>> {
        if !witness.is_consistent_with(statement) {
            return None;
        }
        Some(self.proof_for(statement))
    }
}

impl Default for MockVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofVerifier for MockVerifier {
    fn verify(&self, statement: &TransferStatement, proof: &[u8]) -> bool {
        let expected = self.proof_for(statement);
        !expected.is_empty() && expected == proof
    }
}
