//! Coinsensus Hash Primitive
//!
//! One collision-resistant function `H(field elements) -> field element`,
//! reused for every commitment, nullifier and tree node. Distinct purposes are
//! separated by a [`Domain`] tag absorbed as the first input.
//!
//! - Poseidon: ZK-friendly algebraic hash, the default everywhere a value must
//!   be re-derived inside a proof circuit
//! - BLAKE3: fast field-reducing hash for off-circuit use

pub mod field;
pub mod poseidon;

pub use ark_bn254::Fr;
pub use field::{
    bytes_to_field, field_from_bytes, field_from_hex, field_to_bytes, field_to_hex, field_to_u64,
    FieldDecodeError,
};
pub use poseidon::{Poseidon, PoseidonHasher, PoseidonParams};

use ark_ff::PrimeField;

/// Domain-separation tags.
///
/// Numeric values are part of every derived commitment and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum Domain {
    /// Registry leaf: H(LEAF, commitment)
    Leaf = 1,
    /// Registry interior node: H(NODE, min, max)
    Node = 2,
    /// Per-campaign vote nullifier: H(NULLIFIER, secret, campaign)
    Nullifier = 3,
    /// H(SECRET, secret)
    Secret = 4,
    /// Identity nullifier: H(IDENTITY, secret_hash, voter_id)
    Identity = 5,
    /// H(COMMITMENT, identity_nullifier, secret_hash)
    Commitment = 6,
    /// Quadratic allocation commitment
    Allocation = 7,
    /// Tally digest over sorted nullifiers
    Tally = 8,
}

impl Domain {
    pub fn tag(self) -> Fr {
        Fr::from(self as u64)
    }
}

/// Hash capability used by the registry, prover and tally.
pub trait HashFn: Send + Sync {
    /// Hash an ordered sequence of field elements. Total over all inputs,
    /// including the empty sequence.
    fn hash(&self, inputs: &[Fr]) -> Fr;

    /// Hash with the domain tag prepended
    fn hash_tagged(&self, domain: Domain, inputs: &[Fr]) -> Fr {
        let mut tagged = Vec::with_capacity(inputs.len() + 1);
        tagged.push(domain.tag());
        tagged.extend_from_slice(inputs);
        self.hash(&tagged)
    }
}

/// BLAKE3 over length-prefixed canonical encodings, reduced into the field
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Field;

impl HashFn for Blake3Field {
    fn hash(&self, inputs: &[Fr]) -> Fr {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(inputs.len() as u64).to_le_bytes());
        for input in inputs {
            hasher.update(&field_to_bytes(input));
        }
        Fr::from_le_bytes_mod_order(hasher.finalize().as_bytes())
    }
}

/// Hash data using BLAKE3
pub fn hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}
