//! Campaign parameters, accepted votes and nullifiers

use std::sync::Arc;

use coinsensus_hash::field_to_bytes;
use coinsensus_tally::{AcceptedVote, CampaignParams, StoredCampaign, TallyResult, TallyStore};
use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::{StorageError, StorageResult};

/// Table for campaign parameters by id
const CAMPAIGNS: TableDefinition<u64, &[u8]> = TableDefinition::new("campaigns");

/// Accepted vote signals keyed by campaign id ++ sequence number
const VOTES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("accepted_votes");

/// Nullifiers keyed by campaign id ++ nullifier, valued by sequence number
const NULLIFIERS: TableDefinition<&[u8], u64> = TableDefinition::new("nullifiers");

/// Accepted vote count per campaign
const VOTE_COUNTS: TableDefinition<u64, u64> = TableDefinition::new("vote_counts");

/// Rejected submission count per campaign
const REJECTIONS: TableDefinition<u64, u64> = TableDefinition::new("rejections");

fn vote_key(campaign_id: u64, seq: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&campaign_id.to_be_bytes());
    key[8..].copy_from_slice(&seq.to_be_bytes());
    key
}

fn nullifier_key(campaign_id: u64, vote: &AcceptedVote) -> StorageResult<[u8; 40]> {
    let nullifier = vote
        .public_signals
        .first()
        .ok_or_else(|| StorageError::Corruption("accepted vote without signals".into()))?;
    let mut key = [0u8; 40];
    key[..8].copy_from_slice(&campaign_id.to_be_bytes());
    key[8..].copy_from_slice(&field_to_bytes(nullifier));
    Ok(key)
}

/// Durable campaign state
pub struct CampaignStore {
    db: Arc<Database>,
}

impl CampaignStore {
    /// Create new campaign store
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CAMPAIGNS)?;
            let _ = write_txn.open_table(VOTES)?;
            let _ = write_txn.open_table(NULLIFIERS)?;
            let _ = write_txn.open_table(VOTE_COUNTS)?;
            let _ = write_txn.open_table(REJECTIONS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn put_campaign(&self, params: &CampaignParams) -> StorageResult<()> {
        let encoded = bincode::serialize(params)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut campaigns = write_txn.open_table(CAMPAIGNS)?;
            if campaigns.get(params.campaign_id)?.is_some() {
                return Err(StorageError::CampaignExists(params.campaign_id));
            }
            campaigns.insert(params.campaign_id, encoded.as_slice())?;
        }
        write_txn.commit()?;

        Ok(())
    }

    pub fn get_campaign(&self, campaign_id: u64) -> StorageResult<Option<CampaignParams>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CAMPAIGNS)?;

        let result = match table.get(campaign_id)? {
            Some(data) => Some(bincode::deserialize(data.value())?),
            None => None,
        };

        Ok(result)
    }

    pub fn campaign_ids(&self) -> StorageResult<Vec<u64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CAMPAIGNS)?;

        let mut ids = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            ids.push(key.value());
        }
        Ok(ids)
    }

    /// Mark the nullifier and append the vote in one write transaction
    pub fn append_vote(&self, campaign_id: u64, vote: &AcceptedVote) -> StorageResult<u64> {
        let encoded = bincode::serialize(vote)?;
        let nkey = nullifier_key(campaign_id, vote)?;

        let write_txn = self.db.begin_write()?;
        let seq = {
            let campaigns = write_txn.open_table(CAMPAIGNS)?;
            if campaigns.get(campaign_id)?.is_none() {
                return Err(StorageError::CampaignNotFound(campaign_id));
            }

            let mut nullifiers = write_txn.open_table(NULLIFIERS)?;
            if nullifiers.get(nkey.as_slice())?.is_some() {
                return Err(StorageError::NullifierExists(campaign_id));
            }

            let mut counts = write_txn.open_table(VOTE_COUNTS)?;
            let seq = counts.get(campaign_id)?.map(|c| c.value()).unwrap_or(0);

            let mut votes = write_txn.open_table(VOTES)?;
            votes.insert(vote_key(campaign_id, seq).as_slice(), encoded.as_slice())?;
            nullifiers.insert(nkey.as_slice(), seq)?;
            counts.insert(campaign_id, seq + 1)?;
            seq
        };
        write_txn.commit()?;

        debug!(campaign_id, seq, "Accepted vote persisted");
        Ok(seq)
    }

    pub fn has_nullifier(&self, campaign_id: u64, vote: &AcceptedVote) -> StorageResult<bool> {
        let nkey = nullifier_key(campaign_id, vote)?;
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NULLIFIERS)?;
        let found = table.get(nkey.as_slice())?.is_some();
        Ok(found)
    }

    pub fn vote_count(&self, campaign_id: u64) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VOTE_COUNTS)?;
        let value = table.get(campaign_id)?.map(|c| c.value()).unwrap_or(0);
        Ok(value)
    }

    /// Accepted votes in acceptance order
    pub fn votes(&self, campaign_id: u64) -> StorageResult<Vec<AcceptedVote>> {
        let read_txn = self.db.begin_read()?;
        let counts = read_txn.open_table(VOTE_COUNTS)?;
        let votes = read_txn.open_table(VOTES)?;

        let count = counts.get(campaign_id)?.map(|c| c.value()).unwrap_or(0);
        let mut result = Vec::with_capacity(count as usize);
        for seq in 0..count {
            let data = votes.get(vote_key(campaign_id, seq).as_slice())?.ok_or_else(|| {
                StorageError::Corruption(format!("campaign {} missing vote {}", campaign_id, seq))
            })?;
            result.push(bincode::deserialize(data.value())?);
        }
        Ok(result)
    }

    pub fn increment_rejections(&self, campaign_id: u64) -> StorageResult<u64> {
        let write_txn = self.db.begin_write()?;
        let total = {
            let mut table = write_txn.open_table(REJECTIONS)?;
            let total = table.get(campaign_id)?.map(|c| c.value()).unwrap_or(0) + 1;
            table.insert(campaign_id, total)?;
            total
        };
        write_txn.commit()?;
        Ok(total)
    }

    pub fn rejections(&self, campaign_id: u64) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REJECTIONS)?;
        let value = table.get(campaign_id)?.map(|c| c.value()).unwrap_or(0);
        Ok(value)
    }
}

impl TallyStore for CampaignStore {
    fn save_campaign(&self, params: &CampaignParams) -> TallyResult<()> {
        Ok(self.put_campaign(params)?)
    }

    fn append_vote(&self, campaign_id: u64, vote: &AcceptedVote) -> TallyResult<()> {
        CampaignStore::append_vote(self, campaign_id, vote)?;
        Ok(())
    }

    fn record_rejection(&self, campaign_id: u64) -> TallyResult<()> {
        self.increment_rejections(campaign_id)?;
        Ok(())
    }

    fn load_campaigns(&self) -> TallyResult<Vec<StoredCampaign>> {
        let mut campaigns = Vec::new();
        for campaign_id in self.campaign_ids()? {
            let params = self
                .get_campaign(campaign_id)?
                .ok_or(StorageError::CampaignNotFound(campaign_id))?;
            campaigns.push(StoredCampaign {
                params,
                accepted: self.votes(campaign_id)?,
                rejected: self.rejections(campaign_id)?,
            });
        }
        Ok(campaigns)
    }
}
