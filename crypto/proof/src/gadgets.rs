//! R1CS building blocks over ark-relations
//!
//! Values are tracked next to their linear combinations so the same synthesis
//! code runs in setup mode (no values) and proving mode.

use ark_crypto_primitives::sponge::poseidon::PoseidonConfig;
use ark_ff::{BigInteger, One, PrimeField, Zero};
use ark_relations::r1cs::{ConstraintSystemRef, LinearCombination, SynthesisError, Variable};
use coinsensus_hash::{Domain, Fr};

type Result<T> = std::result::Result<T, SynthesisError>;

/// A linear combination with its (optional) assigned value
#[derive(Clone)]
pub struct Num {
    lc: LinearCombination<Fr>,
    value: Option<Fr>,
}

impl Num {
    pub fn constant(value: Fr) -> Self {
        Self {
            lc: LinearCombination::from((value, Variable::One)),
            value: Some(value),
        }
    }

    pub fn zero() -> Self {
        Self {
            lc: LinearCombination::zero(),
            value: Some(Fr::zero()),
        }
    }

    pub fn witness(cs: &ConstraintSystemRef<Fr>, value: Option<Fr>) -> Result<Self> {
        let var = cs.new_witness_variable(|| value.ok_or(SynthesisError::AssignmentMissing))?;
        Ok(Self {
            lc: LinearCombination::from(var),
            value,
        })
    }

    pub fn input(cs: &ConstraintSystemRef<Fr>, value: Option<Fr>) -> Result<Self> {
        let var = cs.new_input_variable(|| value.ok_or(SynthesisError::AssignmentMissing))?;
        Ok(Self {
            lc: LinearCombination::from(var),
            value,
        })
    }

    pub fn value(&self) -> Option<Fr> {
        self.value
    }

    pub fn add(&self, other: &Num) -> Num {
        Num {
            lc: self.lc.clone() + other.lc.clone(),
            value: self.value.zip(other.value).map(|(a, b)| a + b),
        }
    }

    pub fn sub(&self, other: &Num) -> Num {
        Num {
            lc: self.lc.clone() - other.lc.clone(),
            value: self.value.zip(other.value).map(|(a, b)| a - b),
        }
    }

    pub fn add_constant(&self, c: Fr) -> Num {
        Num {
            lc: self.lc.clone() + (c, Variable::One),
            value: self.value.map(|v| v + c),
        }
    }

    pub fn scale(&self, c: Fr) -> Num {
        Num {
            lc: self.lc.clone() * c,
            value: self.value.map(|v| v * c),
        }
    }

    /// One constraint: self * other = product
    pub fn mul(&self, cs: &ConstraintSystemRef<Fr>, other: &Num) -> Result<Num> {
        let product = Num::witness(cs, self.value.zip(other.value).map(|(a, b)| a * b))?;
        cs.enforce_constraint(self.lc.clone(), other.lc.clone(), product.lc.clone())?;
        Ok(product)
    }

    /// Collapse the combination into a single fresh variable
    pub fn materialize(&self, cs: &ConstraintSystemRef<Fr>) -> Result<Num> {
        let fresh = Num::witness(cs, self.value)?;
        cs.enforce_constraint(self.lc.clone(), one(), fresh.lc.clone())?;
        Ok(fresh)
    }

    pub fn enforce_equal(&self, cs: &ConstraintSystemRef<Fr>, other: &Num) -> Result<()> {
        cs.enforce_constraint(
            self.lc.clone() - other.lc.clone(),
            one(),
            LinearCombination::zero(),
        )
    }
}

fn one() -> LinearCombination<Fr> {
    LinearCombination::from(Variable::One)
}

/// Boolean witness, constrained by b * (1 - b) = 0
#[derive(Clone)]
pub struct Bit {
    num: Num,
}

impl Bit {
    pub fn witness(cs: &ConstraintSystemRef<Fr>, value: Option<bool>) -> Result<Self> {
        let num = Num::witness(cs, value.map(|b| if b { Fr::one() } else { Fr::zero() }))?;
        cs.enforce_constraint(num.lc.clone(), one() - num.lc.clone(), LinearCombination::zero())?;
        Ok(Self { num })
    }

    /// `if self { when_true } else { when_false }`, one constraint
    pub fn select(
        &self,
        cs: &ConstraintSystemRef<Fr>,
        when_true: &Num,
        when_false: &Num,
    ) -> Result<Num> {
        let delta = when_true.sub(when_false);
        let picked = self.num.mul(cs, &delta)?;
        Ok(when_false.add(&picked))
    }
}

/// Constrain `value` to fit in `bits` bits
pub fn range_check(cs: &ConstraintSystemRef<Fr>, value: &Num, bits: usize) -> Result<()> {
    let repr = value.value().map(|v| v.into_bigint());
    let mut sum = Num::zero();
    let mut coeff = Fr::one();
    for i in 0..bits {
        let bit = Bit::witness(cs, repr.as_ref().map(|r| r.get_bit(i)))?;
        sum = sum.add(&bit.num.scale(coeff));
        coeff = coeff + coeff;
    }
    sum.enforce_equal(cs, value)
}

/// In-circuit replay of the native Poseidon sponge
pub struct PoseidonGadget<'a> {
    config: &'a PoseidonConfig<Fr>,
}

impl<'a> PoseidonGadget<'a> {
    pub fn new(config: &'a PoseidonConfig<Fr>) -> Self {
        Self { config }
    }

    fn sbox(&self, cs: &ConstraintSystemRef<Fr>, x: &Num) -> Result<Num> {
        debug_assert_eq!(self.config.alpha, 5);
        let x2 = x.mul(cs, x)?;
        let x4 = x2.mul(cs, &x2)?;
        x4.mul(cs, x)
    }

    fn permute(&self, cs: &ConstraintSystemRef<Fr>, mut state: Vec<Num>) -> Result<Vec<Num>> {
        let half = self.config.full_rounds / 2;
        let rounds = self.config.full_rounds + self.config.partial_rounds;

        for round in 0..rounds {
            let full = round < half || round >= half + self.config.partial_rounds;

            for (i, elem) in state.iter_mut().enumerate() {
                *elem = elem.add_constant(self.config.ark[round][i]);
            }
            for (i, elem) in state.iter_mut().enumerate() {
                if full || i == 0 {
                    *elem = self.sbox(cs, elem)?;
                }
            }

            let mut mixed = Vec::with_capacity(state.len());
            for row in &self.config.mds {
                let mut acc = Num::zero();
                for (elem, m) in state.iter().zip(row) {
                    acc = acc.add(&elem.scale(*m));
                }
                mixed.push(acc.materialize(cs)?);
            }
            state = mixed;
        }

        Ok(state)
    }

    /// Mirrors [`coinsensus_hash::Poseidon`]: the input count is absorbed
    /// first, as a constant since every circuit fixes its arity.
    pub fn hash(&self, cs: &ConstraintSystemRef<Fr>, inputs: &[Num]) -> Result<Num> {
        let rate = self.config.rate;
        let capacity = self.config.capacity;
        let mut state = vec![Num::zero(); rate + capacity];

        let length = Num::constant(Fr::from(inputs.len() as u64));
        for (k, input) in std::iter::once(&length).chain(inputs).enumerate() {
            if k > 0 && k % rate == 0 {
                state = self.permute(cs, state)?;
            }
            let slot = capacity + k % rate;
            state[slot] = state[slot].add(input);
        }
        state = self.permute(cs, state)?;

        Ok(state.swap_remove(capacity))
    }

    pub fn hash_tagged(
        &self,
        cs: &ConstraintSystemRef<Fr>,
        domain: Domain,
        inputs: &[Num],
    ) -> Result<Num> {
        let mut tagged = Vec::with_capacity(inputs.len() + 1);
        tagged.push(Num::constant(domain.tag()));
        tagged.extend_from_slice(inputs);
        self.hash(cs, &tagged)
    }
}
