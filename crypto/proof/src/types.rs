//! Proof, key and witness types shared by every backend

use std::fmt;

use coinsensus_hash::field::serde_fr_vec;
use coinsensus_hash::Fr;
use serde::{Deserialize, Serialize};

/// Largest option count a vote circuit can range-check
pub const MAX_OPTIONS: u32 = 1 << OPTION_BITS;
/// Bit width of the option index range check
pub const OPTION_BITS: usize = 16;
/// Bit width of each quadratic weight
pub const WEIGHT_BITS: usize = 32;
/// Bit width of the unspent credit slack
pub const CREDIT_BITS: usize = 64;

/// Public signal positions. Both proof kinds share the first four; quadratic
/// proofs append the registry root.
pub const SIGNAL_NULLIFIER: usize = 0;
pub const SIGNAL_CAMPAIGN: usize = 1;
/// Option index (standard) or allocation commitment (quadratic)
pub const SIGNAL_CHOICE: usize = 2;
/// Registry root (standard) or total credits (quadratic)
pub const SIGNAL_ANCHOR: usize = 3;
/// Registry root of a quadratic proof
pub const SIGNAL_QUADRATIC_ROOT: usize = 4;

pub const VOTE_SIGNALS: usize = 4;
pub const QUADRATIC_SIGNALS: usize = 5;

/// Identifies a circuit shape; one key pair per id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitId {
    /// Anonymous membership vote over a registry of the given depth
    Vote { depth: usize, options: u32 },
    /// Quadratic credit allocation across `options` options by a member of a
    /// registry of the given depth
    Quadratic { depth: usize, options: u32 },
}

impl CircuitId {
    pub fn kind(&self) -> ProofKind {
        match self {
            CircuitId::Vote { .. } => ProofKind::Standard,
            CircuitId::Quadratic { .. } => ProofKind::Quadratic,
        }
    }

    pub fn options(&self) -> u32 {
        match self {
            CircuitId::Vote { options, .. } | CircuitId::Quadratic { options, .. } => *options,
        }
    }

    /// Registry depth the membership path is built for
    pub fn depth(&self) -> usize {
        match self {
            CircuitId::Vote { depth, .. } | CircuitId::Quadratic { depth, .. } => *depth,
        }
    }

    /// Stable byte encoding, used to derive per-circuit setup randomness
    pub fn to_bytes(&self) -> Vec<u8> {
        let (tag, depth, options) = match self {
            CircuitId::Vote { depth, options } => (1u8, depth, options),
            CircuitId::Quadratic { depth, options } => (2u8, depth, options),
        };
        let mut out = Vec::with_capacity(13);
        out.push(tag);
        out.extend_from_slice(&(*depth as u64).to_le_bytes());
        out.extend_from_slice(&options.to_le_bytes());
        out
    }
}

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitId::Vote { depth, options } => write!(f, "vote(depth={}, options={})", depth, options),
            CircuitId::Quadratic { depth, options } => {
                write!(f, "quadratic(depth={}, options={})", depth, options)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofKind {
    Standard,
    Quadratic,
}

impl ProofKind {
    /// Number of public signals a proof of this kind carries
    pub fn num_signals(self) -> usize {
        match self {
            ProofKind::Standard => VOTE_SIGNALS,
            ProofKind::Quadratic => QUADRATIC_SIGNALS,
        }
    }
}

/// `{ proof, public_signals }`. The first public signal is the nullifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteProof {
    pub kind: ProofKind,
    pub proof: Vec<u8>,
    #[serde(with = "serde_fr_vec")]
    pub public_signals: Vec<Fr>,
}

impl VoteProof {
    pub fn nullifier(&self) -> Option<Fr> {
        self.public_signals.get(SIGNAL_NULLIFIER).copied()
    }

    pub fn campaign_signal(&self) -> Option<Fr> {
        self.public_signals.get(SIGNAL_CAMPAIGN).copied()
    }

    pub fn choice_signal(&self) -> Option<Fr> {
        self.public_signals.get(SIGNAL_CHOICE).copied()
    }

    pub fn anchor_signal(&self) -> Option<Fr> {
        self.public_signals.get(SIGNAL_ANCHOR).copied()
    }

    /// Registry root the voter proved membership under
    pub fn registry_root(&self) -> Option<Fr> {
        match self.kind {
            ProofKind::Standard => self.anchor_signal(),
            ProofKind::Quadratic => self.public_signals.get(SIGNAL_QUADRATIC_ROOT).copied(),
        }
    }
}

/// Backend-specific verification key, tagged with the circuit it belongs to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
    pub circuit: CircuitId,
    pub bytes: Vec<u8>,
}

impl VerificationKey {
    /// Short fingerprint for logs and cache keys
    pub fn fingerprint(&self) -> [u8; 32] {
        *blake3::hash(&self.bytes).as_bytes()
    }
}

/// Opening of a registry leaf: the voter id behind the commitment and the
/// sibling path up to the root
#[derive(Clone)]
pub struct RegistryPath {
    pub voter_id: Fr,
    pub siblings: Vec<Fr>,
    /// Per level, whether the sibling is hashed on the left
    pub sibling_on_left: Vec<bool>,
}

impl RegistryPath {
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }
}

/// Private inputs of the vote circuit
#[derive(Clone)]
pub struct VoteWitness {
    pub secret: Fr,
    pub path: RegistryPath,
}

/// Private inputs of the quadratic circuit
#[derive(Clone)]
pub struct QuadraticWitness {
    pub secret: Fr,
    pub path: RegistryPath,
    pub weights: Vec<u64>,
}

#[derive(Clone)]
pub enum Witness {
    Vote(VoteWitness),
    Quadratic(QuadraticWitness),
}

impl Witness {
    pub fn kind(&self) -> ProofKind {
        match self {
            Witness::Vote(_) => ProofKind::Standard,
            Witness::Quadratic(_) => ProofKind::Quadratic,
        }
    }
}

// Witnesses carry the voter secret; keep it out of logs.
impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Witness::Vote(w) => write!(f, "Witness::Vote(depth={})", w.path.depth()),
            Witness::Quadratic(w) => write!(
                f,
                "Witness::Quadratic(depth={}, options={})",
                w.path.depth(),
                w.weights.len()
            ),
        }
    }
}
