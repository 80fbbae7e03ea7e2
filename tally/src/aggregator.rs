//! Per-campaign serialization point for vote acceptance
//!
//! Verification runs outside the campaign lock and yields a [`VerifiedVote`];
//! the duplicate check, the durable append and the fold run under it.
//! Different campaigns never contend.

use std::sync::Arc;

use coinsensus_proof::{ProofBackend, VoteProof, VoteProver, SIGNAL_NULLIFIER};
use coinsensus_registry::Nullifier;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::campaign::CampaignParams;
use crate::digest::{RunningTally, TallyDigest};
use crate::errors::{TallyError, TallyResult};
use crate::store::{AcceptedVote, TallyStore};
use crate::TallyConfig;

/// Receipt for an accepted vote. Carries no choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accepted {
    pub campaign_id: u64,
    pub nullifier: Nullifier,
    /// Accepted votes in the campaign including this one
    pub accepted_count: u64,
}

/// A proof that passed binding and verification for one campaign.
///
/// Only [`TallyAggregator::verify_vote`] builds one, so
/// [`TallyAggregator::accept_verified`] never folds unchecked signals.
#[derive(Debug, Clone)]
pub struct VerifiedVote {
    campaign_id: u64,
    nullifier: Nullifier,
    public_signals: Vec<coinsensus_hash::Fr>,
}

impl VerifiedVote {
    pub fn campaign_id(&self) -> u64 {
        self.campaign_id
    }

    pub fn nullifier(&self) -> Nullifier {
        self.nullifier
    }
}

struct CampaignTally {
    running: RunningTally,
    rejected: u64,
}

struct CampaignState {
    params: CampaignParams,
    tally: Mutex<CampaignTally>,
}

impl CampaignState {
    fn new(params: CampaignParams) -> Self {
        let running = RunningTally::new(params.kind.clone());
        Self {
            params,
            tally: Mutex::new(CampaignTally { running, rejected: 0 }),
        }
    }
}

/// Verify each proof against the campaign; order of results matches input
pub fn batch_verify<B: ProofBackend>(
    prover: &VoteProver<B>,
    params: &CampaignParams,
    proofs: &[VoteProof],
) -> Vec<bool> {
    proofs
        .par_iter()
        .map(|proof| {
            params.check_binding(proof).is_ok() && prover.verify(proof, &params.verification_key)
        })
        .collect()
}

pub struct TallyAggregator<B: ProofBackend> {
    prover: VoteProver<B>,
    store: Arc<dyn TallyStore>,
    /// One entry per opened campaign, held for the life of the process; the
    /// nullifier set inside is what rejects double votes.
    campaigns: DashMap<u64, Arc<CampaignState>>,
    pool: Option<rayon::ThreadPool>,
}

impl<B: ProofBackend> TallyAggregator<B> {
    pub fn new(backend: Arc<B>, store: Arc<dyn TallyStore>, config: &TallyConfig) -> TallyResult<Self> {
        let pool = match config.verify_workers {
            0 => None,
            workers => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|i| format!("coinsensus-verify-{}", i))
                    .build()
                    .map_err(|e| TallyError::WorkerPool(e.to_string()))?,
            ),
        };
        Ok(Self {
            prover: VoteProver::new(backend),
            store,
            campaigns: DashMap::new(),
            pool,
        })
    }

    /// Rebuild every campaign from `store`, replaying accepted votes
    pub fn restore(backend: Arc<B>, store: Arc<dyn TallyStore>, config: &TallyConfig) -> TallyResult<Self> {
        let aggregator = Self::new(backend, store, config)?;
        for stored in aggregator.store.load_campaigns()? {
            let campaign_id = stored.params.campaign_id;
            let state = CampaignState::new(stored.params);
            {
                let mut tally = state.tally.lock();
                for vote in &stored.accepted {
                    tally.running.fold(&vote.public_signals)?;
                }
                tally.rejected = stored.rejected;
                info!(
                    campaign_id,
                    accepted = tally.running.accepted(),
                    rejected = tally.rejected,
                    "Campaign tally restored"
                );
            }
            aggregator.campaigns.insert(campaign_id, Arc::new(state));
        }
        Ok(aggregator)
    }

    pub fn prover(&self) -> &VoteProver<B> {
        &self.prover
    }

    pub fn open_campaign(&self, params: CampaignParams) -> TallyResult<()> {
        params.validate()?;
        match self.campaigns.entry(params.campaign_id) {
            Entry::Occupied(_) => Err(TallyError::CampaignExists(params.campaign_id)),
            Entry::Vacant(slot) => {
                self.store.save_campaign(&params)?;
                info!(
                    campaign_id = params.campaign_id,
                    circuit = %params.kind.circuit(),
                    "Campaign opened for voting"
                );
                slot.insert(Arc::new(CampaignState::new(params)));
                Ok(())
            }
        }
    }

    fn campaign(&self, campaign_id: u64) -> TallyResult<Arc<CampaignState>> {
        self.campaigns
            .get(&campaign_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(TallyError::UnknownCampaign(campaign_id))
    }

    pub fn campaign_params(&self, campaign_id: u64) -> TallyResult<CampaignParams> {
        Ok(self.campaign(campaign_id)?.params.clone())
    }

    fn check(&self, params: &CampaignParams, proof: &VoteProof) -> Result<(), String> {
        params.check_binding(proof)?;
        if !self.prover.verify(proof, &params.verification_key) {
            return Err("proof verification failed".into());
        }
        Ok(())
    }

    /// Pure check of one proof against a campaign
    pub fn verify(&self, campaign_id: u64, proof: &VoteProof) -> TallyResult<bool> {
        let state = self.campaign(campaign_id)?;
        Ok(self.check(&state.params, proof).is_ok())
    }

    /// Verify many proofs in parallel without accepting them
    pub fn batch_verify(&self, campaign_id: u64, proofs: &[VoteProof]) -> TallyResult<Vec<bool>> {
        let state = self.campaign(campaign_id)?;
        let results = match &self.pool {
            Some(pool) => pool.install(|| batch_verify(&self.prover, &state.params, proofs)),
            None => batch_verify(&self.prover, &state.params, proofs),
        };
        debug!(
            campaign_id,
            total = proofs.len(),
            valid = results.iter().filter(|ok| **ok).count(),
            "Batch verified"
        );
        Ok(results)
    }

    fn reject(&self, campaign_id: u64, tally: &mut CampaignTally) {
        tally.rejected += 1;
        if let Err(e) = self.store.record_rejection(campaign_id) {
            warn!(campaign_id, error = %e, "Failed to persist rejection count");
        }
    }

    /// Binding and proof check for one vote. CPU-bound; async callers should
    /// run it on a blocking thread. Failures count as rejections.
    pub fn verify_vote(&self, campaign_id: u64, proof: &VoteProof) -> TallyResult<VerifiedVote> {
        let state = self.campaign(campaign_id)?;
        if let Err(reason) = self.check(&state.params, proof) {
            warn!(campaign_id, %reason, "Invalid vote proof rejected");
            self.reject(campaign_id, &mut state.tally.lock());
            return Err(TallyError::InvalidProof(reason));
        }
        Ok(VerifiedVote {
            campaign_id,
            nullifier: Nullifier::from_field(proof.public_signals[SIGNAL_NULLIFIER]),
            public_signals: proof.public_signals.clone(),
        })
    }

    /// Deduplicate, persist and fold a verified vote
    pub fn accept_verified(&self, vote: &VerifiedVote) -> TallyResult<Accepted> {
        let campaign_id = vote.campaign_id;
        let state = self.campaign(campaign_id)?;

        let mut tally = state.tally.lock();
        if tally.running.contains(&vote.nullifier) {
            debug!(campaign_id, "Duplicate nullifier");
            self.reject(campaign_id, &mut tally);
            return Err(TallyError::DuplicateVote);
        }

        self.store.append_vote(
            campaign_id,
            &AcceptedVote {
                public_signals: vote.public_signals.clone(),
            },
        )?;
        tally.running.fold(&vote.public_signals)?;

        let accepted_count = tally.running.accepted();
        info!(campaign_id, accepted = accepted_count, "Vote accepted");
        Ok(Accepted {
            campaign_id,
            nullifier: vote.nullifier,
            accepted_count,
        })
    }

    /// Verify, deduplicate and fold one vote
    pub fn accept_vote(&self, campaign_id: u64, proof: &VoteProof) -> TallyResult<Accepted> {
        let verified = self.verify_vote(campaign_id, proof)?;
        self.accept_verified(&verified)
    }

    pub fn get_tally(&self, campaign_id: u64) -> TallyResult<TallyDigest> {
        let state = self.campaign(campaign_id)?;
        let tally = state.tally.lock();
        Ok(tally
            .running
            .digest(self.prover.backend().hasher(), campaign_id, tally.rejected))
    }

    pub fn campaign_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.campaigns.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }
}
