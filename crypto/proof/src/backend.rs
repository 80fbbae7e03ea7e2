//! Proof backend capability
//!
//! The protocol logic (nullifier scheme, allocation checks, tally) only talks
//! to this trait. [`crate::groth16::Groth16Backend`] is the production
//! implementation.

use coinsensus_hash::{Fr, HashFn};

use crate::errors::ProofResult;
use crate::types::{CircuitId, VerificationKey, Witness};

pub trait ProofBackend: Send + Sync {
    /// Hash the circuits are built around; native derivations must use it too
    type Hash: HashFn + Clone + 'static;

    fn hasher(&self) -> &Self::Hash;

    /// Verification key for a circuit, running setup on first use
    fn verification_key(&self, circuit: &CircuitId) -> ProofResult<VerificationKey>;

    /// Produce proof bytes binding `public_signals` to `witness`.
    ///
    /// Callers check the statement natively first; a backend is not required
    /// to detect an unsatisfied witness.
    fn prove(
        &self,
        circuit: &CircuitId,
        public_signals: &[Fr],
        witness: &Witness,
    ) -> ProofResult<Vec<u8>>;

    /// Pure check of `proof` against `public_signals` under `vk`
    fn verify(&self, proof: &[u8], public_signals: &[Fr], vk: &VerificationKey)
        -> ProofResult<bool>;
}
