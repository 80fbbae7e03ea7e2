//! Transcript backend for tests
//!
//! "Proofs" are keyed BLAKE3 transcripts of the public signals. They bind the
//! signals to a verification key but hide nothing and prove nothing, so this
//! backend is only compiled for tests and the `testing` feature.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use coinsensus_hash::{field_to_bytes, Fr, HashFn};

use crate::backend::ProofBackend;
use crate::errors::{ProofError, ProofResult};
use crate::types::{CircuitId, VerificationKey, Witness};

pub struct TranscriptBackend<H> {
    hasher: H,
    prove_calls: AtomicUsize,
    fail_next: AtomicBool,
}

impl<H: HashFn + Clone + 'static> TranscriptBackend<H> {
    pub fn new(hasher: H) -> Self {
        Self {
            hasher,
            prove_calls: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Number of `prove` invocations so far
    pub fn prove_calls(&self) -> usize {
        self.prove_calls.load(Ordering::SeqCst)
    }

    /// Make the next `prove` call fail
    pub fn fail_next_prove(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn key_for(circuit: &CircuitId) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new_derive_key("coinsensus transcript backend key");
        hasher.update(&circuit.to_bytes());
        *hasher.finalize().as_bytes()
    }

    fn transcript(key: &[u8], public_signals: &[Fr]) -> ProofResult<Vec<u8>> {
        let key: [u8; 32] = key
            .try_into()
            .map_err(|_| ProofError::SerializationError("transcript key must be 32 bytes".into()))?;
        let mut hasher = blake3::Hasher::new_keyed(&key);
        for signal in public_signals {
            hasher.update(&field_to_bytes(signal));
        }
        Ok(hasher.finalize().as_bytes().to_vec())
    }
}

impl<H: HashFn + Clone + 'static> ProofBackend for TranscriptBackend<H> {
    type Hash = H;

    fn hasher(&self) -> &H {
        &self.hasher
    }

    fn verification_key(&self, circuit: &CircuitId) -> ProofResult<VerificationKey> {
        Ok(VerificationKey {
            circuit: *circuit,
            bytes: Self::key_for(circuit).to_vec(),
        })
    }

    fn prove(
        &self,
        circuit: &CircuitId,
        public_signals: &[Fr],
        witness: &Witness,
    ) -> ProofResult<Vec<u8>> {
        self.prove_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ProofError::ProofGenerationFailed("injected failure".into()));
        }
        if witness.kind() != circuit.kind() {
            return Err(ProofError::InvalidWitness(format!("{:?} does not fit {}", witness, circuit)));
        }
        Self::transcript(&Self::key_for(circuit), public_signals)
    }

    fn verify(
        &self,
        proof: &[u8],
        public_signals: &[Fr],
        vk: &VerificationKey,
    ) -> ProofResult<bool> {
        Ok(Self::transcript(&vk.bytes, public_signals)? == proof)
    }
}
