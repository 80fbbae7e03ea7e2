//! Vote and quadratic-allocation circuits
//!
//! Public inputs are allocated in signal order (see [`crate::types`]), so the
//! verifier's input vector is exactly the proof's public signals.

use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystem, ConstraintSystemRef, SynthesisError,
};
use coinsensus_hash::{Domain, Fr, Poseidon};

use crate::errors::{ProofError, ProofResult};
use crate::gadgets::{range_check, Bit, Num, PoseidonGadget};
use crate::types::{
    CircuitId, QuadraticWitness, RegistryPath, VoteWitness, CREDIT_BITS, MAX_OPTIONS,
    OPTION_BITS, QUADRATIC_SIGNALS, VOTE_SIGNALS, WEIGHT_BITS,
};

/// Proves registry membership, nullifier derivation and option range:
///
/// 1. `leaf = H(LEAF, H(COMMITMENT, H(IDENTITY, sh, voter_id), sh))` with
///    `sh = H(SECRET, secret)`
/// 2. `leaf` hashes up to `root` through `depth` sibling steps
/// 3. `nullifier = H(NULLIFIER, secret, campaign_id)`
/// 4. `option_index < options`
#[derive(Clone)]
pub struct VoteCircuit {
    hasher: Poseidon,
    depth: usize,
    options: u32,
    signals: Option<Vec<Fr>>,
    witness: Option<VoteWitness>,
}

impl VoteCircuit {
    /// Shape-only instance for key generation
    pub fn blank(hasher: Poseidon, depth: usize, options: u32) -> ProofResult<Self> {
        check_options(options)?;
        Ok(Self {
            hasher,
            depth,
            options,
            signals: None,
            witness: None,
        })
    }

    pub fn with_witness(
        hasher: Poseidon,
        depth: usize,
        options: u32,
        signals: &[Fr],
        witness: VoteWitness,
    ) -> ProofResult<Self> {
        check_options(options)?;
        check_path(&witness.path, depth)?;
        Ok(Self {
            hasher,
            depth,
            options,
            signals: Some(check_signals(signals, VOTE_SIGNALS)?),
            witness: Some(witness),
        })
    }
}

impl ConstraintSynthesizer<Fr> for VoteCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let gadget = PoseidonGadget::new(self.hasher.params().config());
        let signal = |i: usize| self.signals.as_ref().map(|s| s[i]);

        let nullifier = Num::input(&cs, signal(0))?;
        let campaign = Num::input(&cs, signal(1))?;
        let option = Num::input(&cs, signal(2))?;
        let root = Num::input(&cs, signal(3))?;

        let w = self.witness.as_ref();
        let secret = Num::witness(&cs, w.map(|w| w.secret))?;
        enforce_membership(&gadget, &cs, &secret, w.map(|w| &w.path), self.depth, &root)?;

        let derived = gadget.hash_tagged(&cs, Domain::Nullifier, &[secret, campaign])?;
        derived.enforce_equal(&cs, &nullifier)?;

        range_check(&cs, &option, OPTION_BITS)?;
        let headroom = Num::constant(Fr::from(self.options as u64 - 1)).sub(&option);
        range_check(&cs, &headroom, OPTION_BITS)?;

        Ok(())
    }
}

/// Proves a quadratic allocation by a registered voter without revealing the
/// weights:
///
/// 1. the voter's registry leaf hashes up to `root`, as in [`VoteCircuit`]
/// 2. every weight fits in 32 bits
/// 3. `sum(w_i^2) + slack = total_credits` with a 64-bit slack
/// 4. `allocation = H(ALLOCATION, secret, campaign_id, w_0, .., w_n)`
/// 5. `nullifier = H(NULLIFIER, secret, campaign_id)`
#[derive(Clone)]
pub struct QuadraticCircuit {
    hasher: Poseidon,
    depth: usize,
    options: u32,
    signals: Option<Vec<Fr>>,
    witness: Option<QuadraticWitness>,
}

impl QuadraticCircuit {
    pub fn blank(hasher: Poseidon, depth: usize, options: u32) -> ProofResult<Self> {
        check_options(options)?;
        Ok(Self {
            hasher,
            depth,
            options,
            signals: None,
            witness: None,
        })
    }

    pub fn with_witness(
        hasher: Poseidon,
        depth: usize,
        options: u32,
        signals: &[Fr],
        witness: QuadraticWitness,
    ) -> ProofResult<Self> {
        check_options(options)?;
        check_path(&witness.path, depth)?;
        if witness.weights.len() != options as usize {
            return Err(ProofError::InvalidWitness(format!(
                "expected {} weights, got {}",
                options,
                witness.weights.len()
            )));
        }
        Ok(Self {
            hasher,
            depth,
            options,
            signals: Some(check_signals(signals, QUADRATIC_SIGNALS)?),
            witness: Some(witness),
        })
    }
}

impl ConstraintSynthesizer<Fr> for QuadraticCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let gadget = PoseidonGadget::new(self.hasher.params().config());
        let signal = |i: usize| self.signals.as_ref().map(|s| s[i]);

        let nullifier = Num::input(&cs, signal(0))?;
        let campaign = Num::input(&cs, signal(1))?;
        let allocation = Num::input(&cs, signal(2))?;
        let total_credits = Num::input(&cs, signal(3))?;
        let root = Num::input(&cs, signal(4))?;

        let w = self.witness.as_ref();
        let secret = Num::witness(&cs, w.map(|w| w.secret))?;
        enforce_membership(&gadget, &cs, &secret, w.map(|w| &w.path), self.depth, &root)?;

        let mut weights = Vec::with_capacity(self.options as usize);
        let mut spent = Num::zero();
        for i in 0..self.options as usize {
            let weight = Num::witness(&cs, w.map(|w| Fr::from(w.weights[i])))?;
            range_check(&cs, &weight, WEIGHT_BITS)?;
            spent = spent.add(&weight.mul(&cs, &weight)?);
            weights.push(weight);
        }

        let slack = Num::witness(
            &cs,
            total_credits.value().zip(spent.value()).map(|(t, s)| t - s),
        )?;
        range_check(&cs, &slack, CREDIT_BITS)?;
        spent.add(&slack).enforce_equal(&cs, &total_credits)?;

        let mut committed = Vec::with_capacity(weights.len() + 2);
        committed.push(secret.clone());
        committed.push(campaign.clone());
        committed.extend(weights);
        let derived_allocation = gadget.hash_tagged(&cs, Domain::Allocation, &committed)?;
        derived_allocation.enforce_equal(&cs, &allocation)?;

        let derived = gadget.hash_tagged(&cs, Domain::Nullifier, &[secret, campaign])?;
        derived.enforce_equal(&cs, &nullifier)?;

        Ok(())
    }
}

/// Rebuilds the registry leaf of `secret` and walks it up `depth` levels to `root`
fn enforce_membership(
    gadget: &PoseidonGadget<'_>,
    cs: &ConstraintSystemRef<Fr>,
    secret: &Num,
    path: Option<&RegistryPath>,
    depth: usize,
    root: &Num,
) -> Result<(), SynthesisError> {
    let voter_id = Num::witness(cs, path.map(|p| p.voter_id))?;

    let secret_hash = gadget.hash_tagged(cs, Domain::Secret, &[secret.clone()])?;
    let identity = gadget.hash_tagged(cs, Domain::Identity, &[secret_hash.clone(), voter_id])?;
    let commitment = gadget.hash_tagged(cs, Domain::Commitment, &[identity, secret_hash])?;
    let mut current = gadget.hash_tagged(cs, Domain::Leaf, &[commitment])?;

    for level in 0..depth {
        let sibling = Num::witness(cs, path.map(|p| p.siblings[level]))?;
        let on_left = Bit::witness(cs, path.map(|p| p.sibling_on_left[level]))?;
        let left = on_left.select(cs, &sibling, &current)?;
        let right = current.add(&sibling).sub(&left);
        current = gadget.hash_tagged(cs, Domain::Node, &[left, right])?;
    }
    current.enforce_equal(cs, root)
}

/// Number of constraints and variables in a circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitStats {
    pub num_public_inputs: usize,
    pub num_witness_vars: usize,
    pub num_constraints: usize,
}

impl CircuitStats {
    pub fn from_cs(cs: &ConstraintSystemRef<Fr>) -> Self {
        Self {
            num_public_inputs: cs.num_instance_variables(),
            num_witness_vars: cs.num_witness_variables(),
            num_constraints: cs.num_constraints(),
        }
    }
}

/// Synthesize a blank circuit and report its size
pub fn circuit_stats(hasher: &Poseidon, circuit: &CircuitId) -> ProofResult<CircuitStats> {
    let cs = ConstraintSystem::<Fr>::new_ref();
    cs.set_mode(ark_relations::r1cs::SynthesisMode::Setup);
    let result = match *circuit {
        CircuitId::Vote { depth, options } => {
            VoteCircuit::blank(hasher.clone(), depth, options)?.generate_constraints(cs.clone())
        }
        CircuitId::Quadratic { depth, options } => QuadraticCircuit::blank(hasher.clone(), depth, options)?
            .generate_constraints(cs.clone()),
    };
    result.map_err(|e| ProofError::SetupError(format!("Circuit synthesis failed: {}", e)))?;
    Ok(CircuitStats::from_cs(&cs))
}

fn check_options(options: u32) -> ProofResult<()> {
    if options == 0 || options > MAX_OPTIONS {
        return Err(ProofError::UnsupportedCircuit(format!(
            "option count {} outside 1..={}",
            options, MAX_OPTIONS
        )));
    }
    Ok(())
}

fn check_path(path: &RegistryPath, depth: usize) -> ProofResult<()> {
    if path.siblings.len() != depth || path.sibling_on_left.len() != depth {
        return Err(ProofError::InvalidWitness(format!(
            "expected {} path steps, got {}",
            depth,
            path.siblings.len()
        )));
    }
    Ok(())
}

fn check_signals(signals: &[Fr], expected: usize) -> ProofResult<Vec<Fr>> {
    if signals.len() != expected {
        return Err(ProofError::InvalidPublicInput(format!(
            "expected {} public signals, got {}",
            expected,
            signals.len()
        )));
    }
    Ok(signals.to_vec())
}
