//! Coinsensus Voter Registry
//!
//! Identity commitments, per-campaign nullifiers and the Merkle registry that
//! proves a commitment was enrolled without revealing which one.
//!
//! # Lifecycle
//! 1. Voters derive a [`VoterCommitment`] from their [`VoterSecret`] and publish
//!    only the `commitment`.
//! 2. Commitments are appended to a [`VoterRegistry`] during registration.
//! 3. The registry is frozen; its root is fixed for the whole voting phase.
//! 4. Voters obtain a [`MembershipProof`] and feed it to the prover.

pub mod errors;
pub mod identity;
pub mod merkle;
pub mod registry;
pub mod store;

pub use errors::{RegistryError, RegistryResult};
pub use identity::{
    campaign_field, voter_id_from_label, Nullifier, VoterCommitment, VoterCredential, VoterSecret,
};
pub use merkle::{
    hash_leaf, hash_pair, prove_membership, verify_membership, MembershipProof, MerkleTree,
};
pub use registry::{RegistrySnapshot, VoterRegistry};
pub use store::{MemoryRegistryStore, RegistryStore};

