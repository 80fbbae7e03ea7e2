//! Poseidon Hash Implementation
//!
//! ZK-friendly algebraic hash over the BN254 scalar field using the arkworks
//! sponge. The proof circuits re-implement the same permutation as R1CS, so the
//! parameters here are the single source of truth for both sides.

use std::sync::Arc;

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{PoseidonConfig, PoseidonSponge};
use ark_crypto_primitives::sponge::CryptographicSponge;
use ark_ff::{Field, One, PrimeField};

use crate::HashFn;

/// Sponge width (rate + capacity)
pub const WIDTH: usize = 3;
/// Elements absorbed per permutation
pub const RATE: usize = 2;
/// Capacity elements
pub const CAPACITY: usize = 1;
/// Full rounds, split evenly before and after the partial rounds
pub const FULL_ROUNDS: usize = 8;
/// Partial rounds (S-box on the first state element only)
pub const PARTIAL_ROUNDS: usize = 57;
/// S-box exponent
pub const ALPHA: u64 = 5;

const ROUND_CONSTANT_CONTEXT: &str = "coinsensus 2024-01 poseidon bn254 t3 round constants";

/// Poseidon parameters for the BN254 scalar field
#[derive(Clone)]
pub struct PoseidonParams {
    config: PoseidonConfig<Fr>,
}

impl PoseidonParams {
    /// t = 3 (rate 2, capacity 1), 8 full rounds, 57 partial rounds, x^5 S-box
    pub fn new() -> Self {
        Self {
            config: Self::default_config(),
        }
    }

    pub fn config(&self) -> &PoseidonConfig<Fr> {
        &self.config
    }

    fn default_config() -> PoseidonConfig<Fr> {
        let rounds = FULL_ROUNDS + PARTIAL_ROUNDS;

        // Round constants are expanded from a fixed BLAKE3 derive-key context so
        // every build produces the same table.
        let ark: Vec<Vec<Fr>> = (0..rounds)
            .map(|round| {
                (0..WIDTH)
                    .map(|i| {
                        let mut hasher = blake3::Hasher::new_derive_key(ROUND_CONSTANT_CONTEXT);
                        hasher.update(&(round as u64).to_le_bytes());
                        hasher.update(&(i as u64).to_le_bytes());
                        Fr::from_le_bytes_mod_order(hasher.finalize().as_bytes())
                    })
                    .collect()
            })
            .collect();

        // Cauchy matrix 1 / (x_i + y_j) with x_i = i, y_j = t + j
        let mds: Vec<Vec<Fr>> = (0..WIDTH)
            .map(|i| {
                (0..WIDTH)
                    .map(|j| {
                        let x = Fr::from(i as u64);
                        let y = Fr::from((WIDTH + j) as u64);
                        (x + y).inverse().unwrap_or_else(Fr::one)
                    })
                    .collect()
            })
            .collect();

        PoseidonConfig::new(FULL_ROUNDS, PARTIAL_ROUNDS, ALPHA, mds, ark, RATE, CAPACITY)
    }
}

impl Default for PoseidonParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Poseidon hasher for stateful hashing
pub struct PoseidonHasher {
    sponge: PoseidonSponge<Fr>,
}

impl PoseidonHasher {
    pub fn with_params(params: &PoseidonParams) -> Self {
        Self {
            sponge: PoseidonSponge::new(&params.config),
        }
    }

    /// Absorb a field element
    pub fn absorb(&mut self, element: &Fr) {
        self.sponge.absorb(element);
    }

    /// Finalize and return hash as field element
    pub fn finalize(mut self) -> Fr {
        self.sponge.squeeze_field_elements::<Fr>(1)[0]
    }
}

/// Shared, cheaply cloneable Poseidon instance implementing [`HashFn`]
#[derive(Clone)]
pub struct Poseidon {
    params: Arc<PoseidonParams>,
}

impl Poseidon {
    pub fn new() -> Self {
        Self {
            params: Arc::new(PoseidonParams::new()),
        }
    }

    /// Parameters, for circuits that must replay the permutation
    pub fn params(&self) -> &PoseidonParams {
        &self.params
    }
}

impl Default for Poseidon {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Poseidon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poseidon")
            .field("width", &WIDTH)
            .field("full_rounds", &FULL_ROUNDS)
            .field("partial_rounds", &PARTIAL_ROUNDS)
            .finish()
    }
}

impl HashFn for Poseidon {
    /// The input count is absorbed first, so sequences that differ only by
    /// trailing zeros hash apart.
    fn hash(&self, inputs: &[Fr]) -> Fr {
        let mut hasher = PoseidonHasher::with_params(&self.params);
        hasher.absorb(&Fr::from(inputs.len() as u64));
        for input in inputs {
            hasher.absorb(input);
        }
        hasher.finalize()
    }
}
