//! Sorted-pair Merkle tree over registered commitments
//!
//! Leaves are `H(LEAF, commitment)`. Each level of odd length duplicates its
//! last node. Parents are `H(NODE, min(a, b), max(a, b))` with the two
//! children ordered by their canonical integer value, so a path can be checked
//! without knowing the leaf index. Build, prove and verify all use
//! [`hash_pair`]; nothing else combines two nodes.

use coinsensus_hash::field::serde_fr_vec;
use coinsensus_hash::{Domain, Fr, HashFn};
use serde::{Deserialize, Serialize};

use crate::errors::{RegistryError, RegistryResult};

/// `H(LEAF, commitment)`
pub fn hash_leaf<H: HashFn + ?Sized>(hasher: &H, commitment: &Fr) -> Fr {
    hasher.hash_tagged(Domain::Leaf, &[*commitment])
}

/// `H(NODE, smaller, larger)`
pub fn hash_pair<H: HashFn + ?Sized>(hasher: &H, a: &Fr, b: &Fr) -> Fr {
    let (left, right) = order_pair(a, b);
    hasher.hash_tagged(Domain::Node, &[left, right])
}

/// Canonical ordering of two siblings. Returns `(left, right)`.
pub fn order_pair(a: &Fr, b: &Fr) -> (Fr, Fr) {
    if a <= b {
        (*a, *b)
    } else {
        (*b, *a)
    }
}

/// Sibling hashes from leaf to root
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipProof {
    #[serde(with = "serde_fr_vec")]
    pub siblings: Vec<Fr>,
}

impl MembershipProof {
    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }

    /// For each level, whether the sibling sits on the left of the running hash.
    ///
    /// Circuits consume these as swap bits; they follow from the same ordering
    /// rule as [`hash_pair`].
    pub fn sibling_on_left<H: HashFn + ?Sized>(&self, hasher: &H, commitment: &Fr) -> Vec<bool> {
        let mut current = hash_leaf(hasher, commitment);
        self.siblings
            .iter()
            .map(|sibling| {
                let swap = sibling < &current;
                current = hash_pair(hasher, &current, sibling);
                swap
            })
            .collect()
    }
}

/// A fully built tree. Levels are stored padded, so every node has a sibling.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    commitments: Vec<Fr>,
    levels: Vec<Vec<Fr>>,
}

impl MerkleTree {
    /// Build bottom-up from an ordered sequence of commitments.
    ///
    /// The order is part of the registry's identity. An empty input is rejected.
    pub fn build<H: HashFn + ?Sized>(hasher: &H, commitments: &[Fr]) -> RegistryResult<Self> {
        if commitments.is_empty() {
            return Err(RegistryError::EmptyRegistry);
        }

        let mut level: Vec<Fr> = commitments.iter().map(|c| hash_leaf(hasher, c)).collect();
        let mut levels = Vec::new();

        while level.len() > 1 {
            if level.len() % 2 == 1 {
                if let Some(last) = level.last().copied() {
                    level.push(last);
                }
            }
            let next = level
                .chunks(2)
                .map(|pair| hash_pair(hasher, &pair[0], &pair[1]))
                .collect();
            levels.push(std::mem::replace(&mut level, next));
        }
        levels.push(level);

        Ok(Self {
            commitments: commitments.to_vec(),
            levels,
        })
    }

    pub fn root(&self) -> Fr {
        // build() guarantees a non-empty top level
        self.levels
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or_default()
    }

    /// Number of sibling steps from a leaf to the root
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn len(&self) -> usize {
        self.commitments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commitments.is_empty()
    }

    pub fn commitments(&self) -> &[Fr] {
        &self.commitments
    }

    /// Leaf level as built, including the duplicated tail on odd counts
    pub fn leaves(&self) -> &[Fr] {
        &self.levels[0]
    }

    pub fn position(&self, commitment: &Fr) -> Option<usize> {
        self.commitments.iter().position(|c| c == commitment)
    }

    /// Sibling path for a registered commitment
    pub fn prove(&self, commitment: &Fr) -> RegistryResult<MembershipProof> {
        let mut index = self.position(commitment).ok_or(RegistryError::NotRegistered)?;
        let mut siblings = Vec::with_capacity(self.depth());

        for level in &self.levels[..self.depth()] {
            siblings.push(level[index ^ 1]);
            index /= 2;
        }

        Ok(MembershipProof { siblings })
    }
}

/// Build a tree over `commitments` and prove `commitment` against it
pub fn prove_membership<H: HashFn + ?Sized>(
    hasher: &H,
    commitment: &Fr,
    commitments: &[Fr],
) -> RegistryResult<MembershipProof> {
    if !commitments.contains(commitment) {
        return Err(RegistryError::NotRegistered);
    }
    MerkleTree::build(hasher, commitments)?.prove(commitment)
}

/// Recompute the path bottom-up and compare with `root`
pub fn verify_membership<H: HashFn + ?Sized>(
    hasher: &H,
    commitment: &Fr,
    proof: &MembershipProof,
    root: &Fr,
) -> bool {
    let computed = proof
        .siblings
        .iter()
        .fold(hash_leaf(hasher, commitment), |current, sibling| {
            hash_pair(hasher, &current, sibling)
        });
    &computed == root
}
