//! Campaign parameters a tally is bound to

use coinsensus_hash::field::serde_fr;
use coinsensus_hash::Fr;
use coinsensus_proof::{
    CircuitId, ProofKind, VerificationKey, VoteProof, MAX_OPTIONS, SIGNAL_ANCHOR, SIGNAL_CAMPAIGN,
    SIGNAL_CHOICE, SIGNAL_QUADRATIC_ROOT,
};
use coinsensus_registry::campaign_field;
use serde::{Deserialize, Serialize};

use crate::errors::{TallyError, TallyResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignKind {
    /// One option per voter, membership proven against a frozen root
    Standard {
        options: u32,
        #[serde(with = "serde_fr")]
        root: Fr,
        depth: usize,
    },
    /// Quadratic credit allocation with a fixed per-voter budget, by members
    /// of a frozen registry
    Quadratic {
        options: u32,
        total_credits: u64,
        #[serde(with = "serde_fr")]
        root: Fr,
        depth: usize,
    },
}

impl CampaignKind {
    pub fn options(&self) -> u32 {
        match self {
            CampaignKind::Standard { options, .. } | CampaignKind::Quadratic { options, .. } => {
                *options
            }
        }
    }

    pub fn proof_kind(&self) -> ProofKind {
        match self {
            CampaignKind::Standard { .. } => ProofKind::Standard,
            CampaignKind::Quadratic { .. } => ProofKind::Quadratic,
        }
    }

    pub fn circuit(&self) -> CircuitId {
        match self {
            CampaignKind::Standard { options, depth, .. } => CircuitId::Vote {
                depth: *depth,
                options: *options,
            },
            CampaignKind::Quadratic { options, depth, .. } => CircuitId::Quadratic {
                depth: *depth,
                options: *options,
            },
        }
    }

    /// Frozen registry root voters prove membership under
    pub fn root(&self) -> Fr {
        match self {
            CampaignKind::Standard { root, .. } | CampaignKind::Quadratic { root, .. } => *root,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignParams {
    pub campaign_id: u64,
    pub kind: CampaignKind,
    pub verification_key: VerificationKey,
}

impl CampaignParams {
    pub fn validate(&self) -> TallyResult<()> {
        let options = self.kind.options();
        if options == 0 || options > MAX_OPTIONS {
            return Err(TallyError::InvalidParams(format!(
                "{} options outside 1..={}",
                options, MAX_OPTIONS
            )));
        }
        if self.verification_key.circuit != self.kind.circuit() {
            return Err(TallyError::InvalidParams(format!(
                "verification key is for {}, campaign needs {}",
                self.verification_key.circuit,
                self.kind.circuit()
            )));
        }
        Ok(())
    }

    /// Check that a proof's public signals belong to this campaign.
    ///
    /// Returns a user-facing reason on mismatch.
    pub fn check_binding(&self, proof: &VoteProof) -> Result<(), String> {
        if proof.kind != self.kind.proof_kind() {
            return Err("proof kind does not match campaign".into());
        }
        let signals = &proof.public_signals;
        let expected = proof.kind.num_signals();
        if signals.len() != expected {
            return Err(format!("expected {} public signals, got {}", expected, signals.len()));
        }
        if signals[SIGNAL_CAMPAIGN] != campaign_field(self.campaign_id) {
            return Err("proof is for a different campaign".into());
        }
        match &self.kind {
            CampaignKind::Standard { options, root, .. } => {
                if signals[SIGNAL_ANCHOR] != *root {
                    return Err("proof is against a different registry root".into());
                }
                match coinsensus_hash::field_to_u64(&signals[SIGNAL_CHOICE]) {
                    Some(choice) if choice < *options as u64 => {}
                    _ => return Err("option out of range".into()),
                }
            }
            CampaignKind::Quadratic {
                total_credits, root, ..
            } => {
                if signals[SIGNAL_ANCHOR] != Fr::from(*total_credits) {
                    return Err("proof is for a different credit budget".into());
                }
                if signals[SIGNAL_QUADRATIC_ROOT] != *root {
                    return Err("proof is against a different registry root".into());
                }
            }
        }
        Ok(())
    }
}
