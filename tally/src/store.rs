//! Durable tally state
//!
//! A restart must never lose the accepted-nullifier set. Stores persist each
//! accepted vote's public signals; the nullifier is the first signal.

use std::collections::BTreeMap;

use coinsensus_hash::field::serde_fr_vec;
use coinsensus_hash::Fr;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::campaign::CampaignParams;
use crate::errors::{TallyError, TallyResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedVote {
    #[serde(with = "serde_fr_vec")]
    pub public_signals: Vec<Fr>,
}

/// Everything needed to rebuild one campaign's tally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCampaign {
    pub params: CampaignParams,
    /// In acceptance order
    pub accepted: Vec<AcceptedVote>,
    pub rejected: u64,
}

pub trait TallyStore: Send + Sync {
    fn save_campaign(&self, params: &CampaignParams) -> TallyResult<()>;

    /// Persist an accepted vote. Implementations mark the nullifier and append
    /// the signals atomically.
    fn append_vote(&self, campaign_id: u64, vote: &AcceptedVote) -> TallyResult<()>;

    fn record_rejection(&self, campaign_id: u64) -> TallyResult<()>;

    fn load_campaigns(&self) -> TallyResult<Vec<StoredCampaign>>;
}

/// Process-local [`TallyStore`]
#[derive(Default)]
pub struct MemoryTallyStore {
    campaigns: RwLock<BTreeMap<u64, StoredCampaign>>,
}

impl MemoryTallyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TallyStore for MemoryTallyStore {
    fn save_campaign(&self, params: &CampaignParams) -> TallyResult<()> {
        let mut campaigns = self.campaigns.write();
        if campaigns.contains_key(&params.campaign_id) {
            return Err(TallyError::CampaignExists(params.campaign_id));
        }
        campaigns.insert(
            params.campaign_id,
            StoredCampaign {
                params: params.clone(),
                accepted: Vec::new(),
                rejected: 0,
            },
        );
        Ok(())
    }

    fn append_vote(&self, campaign_id: u64, vote: &AcceptedVote) -> TallyResult<()> {
        let mut campaigns = self.campaigns.write();
        let campaign = campaigns
            .get_mut(&campaign_id)
            .ok_or(TallyError::UnknownCampaign(campaign_id))?;
        let nullifier = vote.public_signals.first();
        if campaign
            .accepted
            .iter()
            .any(|v| v.public_signals.first() == nullifier)
        {
            return Err(TallyError::DuplicateVote);
        }
        campaign.accepted.push(vote.clone());
        Ok(())
    }

    fn record_rejection(&self, campaign_id: u64) -> TallyResult<()> {
        let mut campaigns = self.campaigns.write();
        let campaign = campaigns
            .get_mut(&campaign_id)
            .ok_or(TallyError::UnknownCampaign(campaign_id))?;
        campaign.rejected += 1;
        Ok(())
    }

    fn load_campaigns(&self) -> TallyResult<Vec<StoredCampaign>> {
        Ok(self.campaigns.read().values().cloned().collect())
    }
}
