//! Running tallies and their order-independent digest

use std::collections::BTreeSet;

use coinsensus_hash::field::serde_fr;
use coinsensus_hash::{field_to_u64, Domain, Fr, HashFn};
use coinsensus_proof::{VoteProof, SIGNAL_ANCHOR, SIGNAL_CHOICE, SIGNAL_NULLIFIER};
use coinsensus_registry::Nullifier;
use serde::{Deserialize, Serialize};

use crate::campaign::CampaignKind;
use crate::errors::{TallyError, TallyResult};

/// Accepted nullifiers of one campaign, kept sorted
#[derive(Clone, Debug, Default)]
pub struct NullifierSet {
    nullifiers: BTreeSet<Nullifier>,
}

impl NullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns [`TallyError::DuplicateVote`] if already present
    pub fn insert(&mut self, nullifier: Nullifier) -> TallyResult<()> {
        if !self.nullifiers.insert(nullifier) {
            return Err(TallyError::DuplicateVote);
        }
        Ok(())
    }

    pub fn contains(&self, nullifier: &Nullifier) -> bool {
        self.nullifiers.contains(nullifier)
    }

    pub fn len(&self) -> usize {
        self.nullifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nullifiers.is_empty()
    }

    /// H(TALLY, nullifiers in ascending order)
    pub fn tally_hash<H: HashFn + ?Sized>(&self, hasher: &H) -> Fr {
        let sorted: Vec<Fr> = self.nullifiers.iter().map(Nullifier::as_field).collect();
        hasher.hash_tagged(Domain::Tally, &sorted)
    }
}

/// Published result of a campaign.
///
/// Aggregates only; nothing links a nullifier to a choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyDigest {
    pub campaign_id: u64,
    pub accepted_count: u64,
    pub rejected_count: u64,
    #[serde(with = "serde_fr")]
    pub tally_hash: Fr,
    /// Votes per option; empty for quadratic campaigns
    pub option_counts: Vec<u64>,
    /// Sum of the credit budgets granted to accepted voters; zero for
    /// standard campaigns. Spent amounts stay hidden behind the allocation
    /// commitments, so this is an upper bound on spend, not the spend itself.
    pub credits_allotted: u64,
}

/// Accumulator folded one accepted proof at a time
#[derive(Clone, Debug)]
pub struct RunningTally {
    kind: CampaignKind,
    nullifiers: NullifierSet,
    option_counts: Vec<u64>,
    credits_allotted: u64,
}

impl RunningTally {
    pub fn new(kind: CampaignKind) -> Self {
        let option_counts = match &kind {
            CampaignKind::Standard { options, .. } => vec![0; *options as usize],
            CampaignKind::Quadratic { .. } => Vec::new(),
        };
        Self {
            kind,
            nullifiers: NullifierSet::new(),
            option_counts,
            credits_allotted: 0,
        }
    }

    pub fn contains(&self, nullifier: &Nullifier) -> bool {
        self.nullifiers.contains(nullifier)
    }

    pub fn accepted(&self) -> u64 {
        self.nullifiers.len() as u64
    }

    /// Fold already-verified public signals into the tally
    pub fn fold(&mut self, public_signals: &[Fr]) -> TallyResult<Nullifier> {
        let expected = self.kind.proof_kind().num_signals();
        if public_signals.len() != expected {
            return Err(TallyError::InvalidProof(format!(
                "expected {} public signals, got {}",
                expected,
                public_signals.len()
            )));
        }
        let nullifier = Nullifier::from_field(public_signals[SIGNAL_NULLIFIER]);
        if self.nullifiers.contains(&nullifier) {
            return Err(TallyError::DuplicateVote);
        }

        match &self.kind {
            CampaignKind::Standard { .. } => {
                let slot = field_to_u64(&public_signals[SIGNAL_CHOICE])
                    .and_then(|choice| usize::try_from(choice).ok())
                    .filter(|choice| *choice < self.option_counts.len())
                    .ok_or_else(|| TallyError::InvalidProof("option out of range".into()))?;
                self.option_counts[slot] += 1;
            }
            CampaignKind::Quadratic { .. } => {
                let credits = field_to_u64(&public_signals[SIGNAL_ANCHOR])
                    .ok_or_else(|| TallyError::InvalidProof("credit budget out of range".into()))?;
                self.credits_allotted = self.credits_allotted.saturating_add(credits);
            }
        }

        self.nullifiers.insert(nullifier)?;
        Ok(nullifier)
    }

    pub fn digest<H: HashFn + ?Sized>(&self, hasher: &H, campaign_id: u64, rejected_count: u64) -> TallyDigest {
        TallyDigest {
            campaign_id,
            accepted_count: self.accepted(),
            rejected_count,
            tally_hash: self.nullifiers.tally_hash(hasher),
            option_counts: self.option_counts.clone(),
            credits_allotted: self.credits_allotted,
        }
    }
}

/// Digest of a set of accepted proofs.
///
/// Proofs are folded in sorted order, so any permutation of the input yields
/// the same digest. Entries that fail to fold (malformed signals, repeated
/// nullifiers) are left out of the aggregates and counted as rejected.
pub fn compute_tally<H: HashFn + ?Sized>(
    hasher: &H,
    campaign_id: u64,
    kind: &CampaignKind,
    accepted: &[VoteProof],
) -> TallyDigest {
    let mut signals: Vec<&[Fr]> = accepted.iter().map(|p| p.public_signals.as_slice()).collect();
    signals.sort();

    let mut running = RunningTally::new(kind.clone());
    let mut rejected = 0u64;
    for public_signals in signals {
        if let Err(err) = running.fold(public_signals) {
            tracing::debug!(campaign_id, %err, "entry left out of tally");
            rejected += 1;
        }
    }
    running.digest(hasher, campaign_id, rejected)
}
