//! Coinsensus Vote Proofs
//!
//! Zero-knowledge proofs for anonymous votes and quadratic credit allocations.
//!
//! Both proof kinds share one lifecycle:
//! **construct witness → generate proof → verify proof**.
//!
//! - [`VoteProver`] derives public signals, checks the statement natively and
//!   hands the witness to a [`ProofBackend`].
//! - [`Groth16Backend`] proves with Groth16 over BN254; the circuits replay
//!   the Poseidon hash used by the registry.
//! - Verification is pure and safe to run concurrently; recording nullifiers
//!   is the tally's job.

pub mod backend;
pub mod circuits;
pub mod errors;
pub mod gadgets;
pub mod groth16;
pub mod prover;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

use serde::{Deserialize, Serialize};

pub use backend::ProofBackend;
pub use circuits::{circuit_stats, CircuitStats, QuadraticCircuit, VoteCircuit};
pub use errors::{ProofError, ProofResult};
pub use groth16::{Groth16Backend, DEFAULT_MAX_DEPTH};
pub use prover::{allocation_commitment, allocation_cost, VoteProver, MAX_WEIGHT};
pub use types::{
    CircuitId, ProofKind, QuadraticWitness, RegistryPath, VerificationKey, VoteProof, VoteWitness,
    Witness, MAX_OPTIONS, QUADRATIC_SIGNALS, SIGNAL_ANCHOR, SIGNAL_CAMPAIGN, SIGNAL_CHOICE,
    SIGNAL_NULLIFIER, SIGNAL_QUADRATIC_ROOT, VOTE_SIGNALS,
};

/// Prover configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    /// Secret seed for deterministic circuit setup. There is no built-in
    /// value; every deployment generates its own.
    pub setup_seed: Option<u64>,
    /// Deepest registry a circuit is generated for
    pub max_depth: usize,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            setup_seed: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ProverConfig {
    /// Small trees and a fixed, public seed for tests
    pub fn testing() -> Self {
        Self {
            setup_seed: Some(1),
            max_depth: 8,
        }
    }

    /// A freshly drawn setup seed, kept within TOML's signed integer range
    pub fn generated() -> Self {
        use rand::Rng;
        Self {
            setup_seed: Some(rand::thread_rng().gen_range(0..=i64::MAX as u64)),
            ..Self::default()
        }
    }

    pub fn backend(&self) -> ProofResult<Groth16Backend> {
        let seed = self
            .setup_seed
            .ok_or_else(|| ProofError::SetupError("no setup seed configured".into()))?;
        Ok(Groth16Backend::new(seed).with_max_depth(self.max_depth))
    }
}
