//! Append-only voter registry with a freeze step
//!
//! Registration appends commitments in arrival order. `freeze` builds the
//! tree once and fixes the root; after that the registry only answers
//! membership queries.

use std::collections::HashSet;

use coinsensus_hash::field::{serde_fr, serde_fr_vec};
use coinsensus_hash::{Fr, HashFn};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{RegistryError, RegistryResult};
use crate::merkle::{MembershipProof, MerkleTree};

/// Portable form of a frozen registry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(with = "serde_fr_vec")]
    pub commitments: Vec<Fr>,
    #[serde(with = "serde_fr")]
    pub root: Fr,
}

impl RegistrySnapshot {
    pub fn to_json(&self) -> RegistryResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| RegistryError::InvalidEncoding(e.to_string()))
    }

    pub fn from_json(s: &str) -> RegistryResult<Self> {
        serde_json::from_str(s).map_err(|e| RegistryError::InvalidEncoding(e.to_string()))
    }
}

/// Voter registry for one campaign
pub struct VoterRegistry<H> {
    hasher: H,
    commitments: Vec<Fr>,
    seen: HashSet<Fr>,
    tree: Option<MerkleTree>,
}

impl<H: HashFn> VoterRegistry<H> {
    pub fn new(hasher: H) -> Self {
        Self {
            hasher,
            commitments: Vec::new(),
            seen: HashSet::new(),
            tree: None,
        }
    }

    /// Append a commitment. Returns its position.
    pub fn register(&mut self, commitment: Fr) -> RegistryResult<usize> {
        if self.tree.is_some() {
            return Err(RegistryError::Frozen);
        }
        if !self.seen.insert(commitment) {
            return Err(RegistryError::DuplicateCommitment);
        }
        self.commitments.push(commitment);
        Ok(self.commitments.len() - 1)
    }

    /// Build the tree and fix the root. Idempotent once frozen.
    pub fn freeze(&mut self) -> RegistryResult<Fr> {
        if let Some(tree) = &self.tree {
            return Ok(tree.root());
        }
        let tree = MerkleTree::build(&self.hasher, &self.commitments)?;
        let root = tree.root();
        info!(
            members = self.commitments.len(),
            depth = tree.depth(),
            "Registry frozen"
        );
        self.tree = Some(tree);
        Ok(root)
    }

    pub fn is_frozen(&self) -> bool {
        self.tree.is_some()
    }

    pub fn root(&self) -> Option<Fr> {
        self.tree.as_ref().map(MerkleTree::root)
    }

    pub fn depth(&self) -> Option<usize> {
        self.tree.as_ref().map(MerkleTree::depth)
    }

    pub fn len(&self) -> usize {
        self.commitments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commitments.is_empty()
    }

    pub fn contains(&self, commitment: &Fr) -> bool {
        self.seen.contains(commitment)
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Membership proof against the frozen root
    pub fn prove(&self, commitment: &Fr) -> RegistryResult<MembershipProof> {
        let tree = self.tree.as_ref().ok_or(RegistryError::NotFrozen)?;
        tree.prove(commitment)
    }

    pub fn snapshot(&self) -> RegistryResult<RegistrySnapshot> {
        let root = self.root().ok_or(RegistryError::NotFrozen)?;
        Ok(RegistrySnapshot {
            commitments: self.commitments.clone(),
            root,
        })
    }

    /// Rebuild a frozen registry, rejecting snapshots whose root does not match
    pub fn from_snapshot(hasher: H, snapshot: &RegistrySnapshot) -> RegistryResult<Self> {
        let mut registry = Self::new(hasher);
        for commitment in &snapshot.commitments {
            registry.register(*commitment)?;
        }
        if registry.freeze()? != snapshot.root {
            return Err(RegistryError::RootMismatch);
        }
        Ok(registry)
    }
}
