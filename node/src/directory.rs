//! Campaign/storage collaborator
//!
//! Campaign metadata (options, schedule, status) is owned outside the core.

use async_trait::async_trait;
use coinsensus_hash::field::serde_fr;
use coinsensus_hash::Fr;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignInfo {
    pub options: u32,
    /// Unix seconds; votes at or after this instant are refused
    pub end_time: u64,
    pub is_active: bool,
}

impl CampaignInfo {
    pub fn is_open(&self, now: u64) -> bool {
        self.is_active && now < self.end_time
    }
}

/// What the directory learns about an accepted vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedVoteInfo {
    /// Public choice signal: option index, or allocation commitment
    #[serde(with = "serde_fr")]
    pub choice: Fr,
    #[serde(with = "serde_fr")]
    pub nullifier: Fr,
    pub accepted_count: u64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Campaign directory unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CampaignDirectory: Send + Sync {
    async fn get_campaign(&self, campaign_id: u64) -> Result<Option<CampaignInfo>, DirectoryError>;

    async fn record_accepted_vote(
        &self,
        campaign_id: u64,
        vote: &AcceptedVoteInfo,
    ) -> Result<(), DirectoryError>;
}

/// In-process directory
#[derive(Default)]
pub struct MemoryCampaignDirectory {
    campaigns: DashMap<u64, CampaignInfo>,
    recorded: Mutex<Vec<(u64, AcceptedVoteInfo)>>,
}

impl MemoryCampaignDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, campaign_id: u64, info: CampaignInfo) {
        self.campaigns.insert(campaign_id, info);
    }

    pub fn close(&self, campaign_id: u64) {
        if let Some(mut info) = self.campaigns.get_mut(&campaign_id) {
            info.is_active = false;
        }
    }

    pub fn recorded(&self) -> Vec<(u64, AcceptedVoteInfo)> {
        self.recorded.lock().clone()
    }
}

#[async_trait]
impl CampaignDirectory for MemoryCampaignDirectory {
    async fn get_campaign(&self, campaign_id: u64) -> Result<Option<CampaignInfo>, DirectoryError> {
        Ok(self.campaigns.get(&campaign_id).map(|info| info.clone()))
    }

    async fn record_accepted_vote(
        &self,
        campaign_id: u64,
        vote: &AcceptedVoteInfo,
    ) -> Result<(), DirectoryError> {
        self.recorded.lock().push((campaign_id, vote.clone()));
        Ok(())
    }
}
