//! Vote proof construction and verification
//!
//! Every statement is checked natively before the backend is invoked, so an
//! invalid allocation or a stale membership proof never costs a proving run
//! and never yields a proof.

use std::sync::Arc;
use std::time::Instant;

use coinsensus_hash::{Domain, Fr, HashFn};
use coinsensus_registry::{
    campaign_field, verify_membership, MembershipProof, Nullifier, VoterCredential, VoterSecret,
};
use tracing::debug;

use crate::backend::ProofBackend;
use crate::errors::{ProofError, ProofResult};
use crate::types::{
    CircuitId, ProofKind, QuadraticWitness, RegistryPath, VerificationKey, VoteProof, VoteWitness,
    Witness, MAX_OPTIONS, WEIGHT_BITS,
};

/// Largest weight the quadratic circuit can range-check
pub const MAX_WEIGHT: u64 = (1u64 << WEIGHT_BITS) - 1;

/// `sum(w_i^2)` with explicit overflow checks; fails unless it fits `total_credits`
pub fn allocation_cost(weights: &[u64], total_credits: u64) -> ProofResult<u64> {
    if weights.is_empty() {
        return Err(ProofError::InvalidAllocation("no options to allocate".into()));
    }
    let mut cost: u64 = 0;
    for (i, &weight) in weights.iter().enumerate() {
        if weight > MAX_WEIGHT {
            return Err(ProofError::InvalidAllocation(format!(
                "weight {} at option {} exceeds {}",
                weight, i, MAX_WEIGHT
            )));
        }
        cost = weight
            .checked_mul(weight)
            .and_then(|square| cost.checked_add(square))
            .ok_or_else(|| {
                ProofError::InvalidAllocation(format!("credit cost overflows at option {}", i))
            })?;
    }
    if cost > total_credits {
        return Err(ProofError::InvalidAllocation(format!(
            "cost {} exceeds {} credits",
            cost, total_credits
        )));
    }
    Ok(cost)
}

/// `H(ALLOCATION, secret, campaign_id, w_0, .., w_n)`
pub fn allocation_commitment<H: HashFn + ?Sized>(
    hasher: &H,
    secret: &VoterSecret,
    campaign_id: u64,
    weights: &[u64],
) -> Fr {
    let mut inputs = Vec::with_capacity(weights.len() + 2);
    inputs.push(secret.to_field());
    inputs.push(campaign_field(campaign_id));
    inputs.extend(weights.iter().map(|w| Fr::from(*w)));
    hasher.hash_tagged(Domain::Allocation, &inputs)
}

/// Builds and checks vote proofs on top of a [`ProofBackend`]
pub struct VoteProver<B> {
    backend: Arc<B>,
}

impl<B> Clone for VoteProver<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: ProofBackend> VoteProver<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Anonymous vote for `option_index` out of `options`.
    ///
    /// Public signals: `[nullifier, campaign_id, option_index, root]`.
    pub fn generate_vote_proof(
        &self,
        credential: &VoterCredential,
        option_index: u32,
        campaign_id: u64,
        options: u32,
        membership: &MembershipProof,
        root: Fr,
    ) -> ProofResult<VoteProof> {
        if options == 0 || options > MAX_OPTIONS || option_index >= options {
            return Err(ProofError::InvalidOption {
                index: option_index,
                options,
            });
        }

        let path = self.registry_path(credential, membership, &root)?;
        let hasher = self.backend.hasher();
        let nullifier = Nullifier::derive(hasher, &credential.secret, campaign_id);
        let public_signals = vec![
            nullifier.as_field(),
            campaign_field(campaign_id),
            Fr::from(option_index as u64),
            root,
        ];
        let circuit = CircuitId::Vote {
            depth: path.depth(),
            options,
        };
        let witness = Witness::Vote(VoteWitness {
            secret: credential.secret.to_field(),
            path,
        });

        let proof = self.run_backend(&circuit, &public_signals, &witness)?;
        Ok(VoteProof {
            kind: ProofKind::Standard,
            proof,
            public_signals,
        })
    }

    /// Quadratic allocation of `total_credits` across `weights.len()` options
    /// by a registered voter.
    ///
    /// Public signals:
    /// `[nullifier, campaign_id, allocation_commitment, total_credits, root]`.
    pub fn generate_quadratic_proof(
        &self,
        credential: &VoterCredential,
        weights: &[u64],
        total_credits: u64,
        campaign_id: u64,
        membership: &MembershipProof,
        root: Fr,
    ) -> ProofResult<VoteProof> {
        let cost = allocation_cost(weights, total_credits)?;
        let options = u32::try_from(weights.len())
            .ok()
            .filter(|n| *n <= MAX_OPTIONS)
            .ok_or_else(|| {
                ProofError::InvalidAllocation(format!("{} options exceeds {}", weights.len(), MAX_OPTIONS))
            })?;
        let path = self.registry_path(credential, membership, &root)?;

        let hasher = self.backend.hasher();
        let secret = &credential.secret;
        let nullifier = Nullifier::derive(hasher, secret, campaign_id);
        let public_signals = vec![
            nullifier.as_field(),
            campaign_field(campaign_id),
            allocation_commitment(hasher, secret, campaign_id, weights),
            Fr::from(total_credits),
            root,
        ];
        let circuit = CircuitId::Quadratic {
            depth: path.depth(),
            options,
        };
        let witness = Witness::Quadratic(QuadraticWitness {
            secret: secret.to_field(),
            path,
            weights: weights.to_vec(),
        });

        debug!(campaign_id, options, cost, total_credits, "Allocation within budget");
        let proof = self.run_backend(&circuit, &public_signals, &witness)?;
        Ok(VoteProof {
            kind: ProofKind::Quadratic,
            proof,
            public_signals,
        })
    }

    /// Native membership check, then the path the circuits replay
    fn registry_path(
        &self,
        credential: &VoterCredential,
        membership: &MembershipProof,
        root: &Fr,
    ) -> ProofResult<RegistryPath> {
        let hasher = self.backend.hasher();
        let commitment = credential.commitment(hasher).commitment;
        if !verify_membership(hasher, &commitment, membership, root) {
            return Err(ProofError::NotRegistered);
        }
        Ok(RegistryPath {
            voter_id: credential.voter_id,
            siblings: membership.siblings.clone(),
            sibling_on_left: membership.sibling_on_left(hasher, &commitment),
        })
    }

    fn run_backend(
        &self,
        circuit: &CircuitId,
        public_signals: &[Fr],
        witness: &Witness,
    ) -> ProofResult<Vec<u8>> {
        let start = Instant::now();
        let proof = self
            .backend
            .prove(circuit, public_signals, witness)
            .map_err(|e| match e {
                ProofError::ProofGenerationFailed(_) => e,
                other => ProofError::ProofGenerationFailed(other.to_string()),
            })?;
        debug!(
            circuit = %circuit,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Vote proof generated"
        );
        Ok(proof)
    }

    /// Pure verification. Malformed input verifies as false.
    pub fn verify_proof(&self, proof: &[u8], public_signals: &[Fr], vk: &VerificationKey) -> bool {
        match self.backend.verify(proof, public_signals, vk) {
            Ok(valid) => valid,
            Err(e) => {
                debug!(error = %e, "Proof rejected before pairing check");
                false
            }
        }
    }

    /// Verify a [`VoteProof`], additionally requiring its kind to match the key
    pub fn verify(&self, proof: &VoteProof, vk: &VerificationKey) -> bool {
        proof.kind == vk.circuit.kind() && self.verify_proof(&proof.proof, &proof.public_signals, vk)
    }
}
