//! Groth16 over BN254 using arkworks
//!
//! Keys are generated per [`CircuitId`] on first use and cached. Setup
//! randomness is derived from a configured seed and the circuit id, so every
//! process derives the same keys and persisted verification keys stay valid
//! across restarts. Anyone holding the seed can rebuild the setup trapdoor and
//! forge proofs: the seed is deployment secret material, never a constant.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey, Proof, ProvingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{rngs::StdRng, SeedableRng};
use coinsensus_hash::Poseidon;
use parking_lot::RwLock;
use rand::rngs::OsRng;
use tracing::{debug, info};

use crate::backend::ProofBackend;
use crate::circuits::{QuadraticCircuit, VoteCircuit};
use crate::errors::{ProofError, ProofResult};
use crate::types::{CircuitId, VerificationKey, Witness};

const SETUP_CONTEXT: &str = "coinsensus 2024-01 groth16 bn254 circuit setup";

struct CircuitKeys {
    pk: ProvingKey<Bn254>,
    vk: VerificationKey,
}

/// Registry depth accepted when no limit is configured
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// Groth16 proof backend
pub struct Groth16Backend {
    hasher: Poseidon,
    setup_seed: u64,
    max_depth: usize,
    keys: RwLock<HashMap<CircuitId, Arc<CircuitKeys>>>,
    prepared: RwLock<HashMap<[u8; 32], PreparedVerifyingKey<Bn254>>>,
}

impl Groth16Backend {
    pub fn new(setup_seed: u64) -> Self {
        Self {
            hasher: Poseidon::new(),
            setup_seed,
            max_depth: DEFAULT_MAX_DEPTH,
            keys: RwLock::new(HashMap::new()),
            prepared: RwLock::new(HashMap::new()),
        }
    }

    /// Refuse setup for circuits over registries deeper than `max_depth`
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn setup_rng(&self, circuit: &CircuitId) -> StdRng {
        let mut hasher = blake3::Hasher::new_derive_key(SETUP_CONTEXT);
        hasher.update(&self.setup_seed.to_le_bytes());
        hasher.update(&circuit.to_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    fn keys(&self, circuit: &CircuitId) -> ProofResult<Arc<CircuitKeys>> {
        if circuit.depth() > self.max_depth {
            return Err(ProofError::UnsupportedCircuit(format!(
                "{} exceeds the maximum registry depth {}",
                circuit, self.max_depth
            )));
        }
        if let Some(keys) = self.keys.read().get(circuit) {
            return Ok(Arc::clone(keys));
        }

        let start = Instant::now();
        let mut rng = self.setup_rng(circuit);
        let (pk, vk) = match *circuit {
            CircuitId::Vote { depth, options } => Groth16::<Bn254>::circuit_specific_setup(
                VoteCircuit::blank(self.hasher.clone(), depth, options)?,
                &mut rng,
            ),
            CircuitId::Quadratic { depth, options } => Groth16::<Bn254>::circuit_specific_setup(
                QuadraticCircuit::blank(self.hasher.clone(), depth, options)?,
                &mut rng,
            ),
        }
        .map_err(|e| ProofError::SetupError(format!("Setup failed for {}: {}", circuit, e)))?;

        let mut bytes = Vec::new();
        vk.serialize_compressed(&mut bytes)
            .map_err(|e| ProofError::SerializationError(format!("VK serialization error: {}", e)))?;
        let vk = VerificationKey {
            circuit: *circuit,
            bytes,
        };
        info!(
            circuit = %circuit,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Circuit keys generated"
        );

        // Concurrent setups of the same circuit derive identical keys; keep the first.
        let mut keys = self.keys.write();
        let entry = keys
            .entry(*circuit)
            .or_insert_with(|| Arc::new(CircuitKeys { pk, vk }));
        Ok(Arc::clone(entry))
    }

    fn prepared_key(&self, vk: &VerificationKey) -> ProofResult<PreparedVerifyingKey<Bn254>> {
        let fingerprint = vk.fingerprint();
        if let Some(pvk) = self.prepared.read().get(&fingerprint) {
            return Ok(pvk.clone());
        }
        let raw = ark_groth16::VerifyingKey::<Bn254>::deserialize_compressed(vk.bytes.as_slice())
            .map_err(|e| {
                ProofError::SerializationError(format!("VK deserialization error: {}", e))
            })?;
        let pvk = prepare_verifying_key(&raw);
        self.prepared.write().insert(fingerprint, pvk.clone());
        Ok(pvk)
    }
}

impl ProofBackend for Groth16Backend {
    type Hash = Poseidon;

    fn hasher(&self) -> &Poseidon {
        &self.hasher
    }

    fn verification_key(&self, circuit: &CircuitId) -> ProofResult<VerificationKey> {
        Ok(self.keys(circuit)?.vk.clone())
    }

    fn prove(
        &self,
        circuit: &CircuitId,
        public_signals: &[Fr],
        witness: &Witness,
    ) -> ProofResult<Vec<u8>> {
        let keys = self.keys(circuit)?;
        let mut rng = OsRng;
        let start = Instant::now();

        let proof = match (*circuit, witness) {
            (CircuitId::Vote { depth, options }, Witness::Vote(w)) => {
                let synth = VoteCircuit::with_witness(
                    self.hasher.clone(),
                    depth,
                    options,
                    public_signals,
                    w.clone(),
                )?;
                Groth16::<Bn254>::prove(&keys.pk, synth, &mut rng)
            }
            (CircuitId::Quadratic { depth, options }, Witness::Quadratic(w)) => {
                let synth = QuadraticCircuit::with_witness(
                    self.hasher.clone(),
                    depth,
                    options,
                    public_signals,
                    w.clone(),
                )?;
                Groth16::<Bn254>::prove(&keys.pk, synth, &mut rng)
            }
            (circuit, witness) => {
                return Err(ProofError::InvalidWitness(format!(
                    "{:?} does not fit {}",
                    witness, circuit
                )))
            }
        }
        .map_err(|e| ProofError::ProofGenerationFailed(format!("Proving failed: {}", e)))?;

        let mut bytes = Vec::new();
        proof
            .serialize_compressed(&mut bytes)
            .map_err(|e| ProofError::SerializationError(format!("Proof serialization error: {}", e)))?;

        debug!(
            circuit = %circuit,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Groth16 proof generated"
        );
        Ok(bytes)
    }

    fn verify(
        &self,
        proof: &[u8],
        public_signals: &[Fr],
        vk: &VerificationKey,
    ) -> ProofResult<bool> {
        let pvk = self.prepared_key(vk)?;
        if public_signals.len() + 1 != pvk.vk.gamma_abc_g1.len() {
            return Err(ProofError::InvalidPublicInput(format!(
                "expected {} public signals, got {}",
                pvk.vk.gamma_abc_g1.len() - 1,
                public_signals.len()
            )));
        }
        let proof = Proof::<Bn254>::deserialize_compressed(proof)
            .map_err(|e| ProofError::SerializationError(format!("Proof deserialization error: {}", e)))?;

        Groth16::<Bn254>::verify_with_processed_vk(&pvk, public_signals, &proof)
            .map_err(|e| ProofError::VerificationFailed(format!("Verification error: {}", e)))
    }
}
