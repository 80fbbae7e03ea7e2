//! Coinsensus: privacy-preserving, Sybil-resistant voting core
//!
//! This is the root crate that re-exports all Coinsensus components for
//! integration testing and provides unified access to the protocol primitives.
//!
//! ## Architecture Overview
//!
//! A voter registers a commitment to a secret. Once the campaign's registry is
//! frozen, the voter proves in zero knowledge that their commitment is in the
//! registry and publishes a nullifier that identifies the vote, not the voter.
//! Eligibility rules over public ledger data gate who may submit, and the tally
//! aggregator counts each nullifier once.
//!
//! ## Crate Organization
//!
//! - `coinsensus-hash`: field hash with domain separation (Poseidon, BLAKE3)
//! - `coinsensus-registry`: commitments, nullifiers, Merkle registry
//! - `coinsensus-proof`: circuits, Groth16 backend, vote prover
//! - `coinsensus-sybil`: eligibility engine and reputation
//! - `coinsensus-tally`: proof acceptance and tally digests
//! - `coinsensus-storage`: redb-backed persistence
//! - `coinsensus-node`: the vote submission service

pub use coinsensus_hash as hash;
pub use coinsensus_node as node;
pub use coinsensus_proof as proof;
pub use coinsensus_registry as registry;
pub use coinsensus_storage as storage;
pub use coinsensus_sybil as sybil;
pub use coinsensus_tally as tally;

/// Coinsensus version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use coinsensus_hash::{Blake3Field, Domain, Fr, HashFn, Poseidon};
    pub use coinsensus_node::{
        Ballot, CampaignDirectory, CampaignInfo, MemoryCampaignDirectory, ServiceConfig, VoteRequest,
        VotingError, VotingService,
    };
    pub use coinsensus_proof::{
        Groth16Backend, ProofBackend, ProofKind, ProverConfig, VerificationKey, VoteProof, VoteProver,
    };
    pub use coinsensus_registry::{
        prove_membership, verify_membership, MembershipProof, MemoryRegistryStore, MerkleTree,
        Nullifier, RegistryStore, VoterCommitment, VoterCredential, VoterRegistry, VoterSecret,
    };
    pub use coinsensus_storage::{Storage, StorageConfig};
    pub use coinsensus_sybil::{
        Address, Clock, EligibilityConfig, EligibilityDecision, EligibilityEngine, LedgerClient,
        LedgerProfile, SystemClock,
    };
    pub use coinsensus_tally::{
        compute_tally, CampaignKind, CampaignParams, TallyAggregator, TallyConfig, TallyDigest,
    };
}
