//! Coinsensus Storage Layer
//!
//! Durable state that must survive restarts.
//!
//! # Architecture
//!
//! The storage layer uses redb (an embedded database) for:
//! - Campaign parameters and verification keys
//! - Accepted vote signals, appended in the same transaction that marks the
//!   nullifier
//! - Rejection counters
//! - Per-address eligibility records

pub mod campaign;
pub mod eligibility;
mod error;

pub use campaign::CampaignStore;
pub use eligibility::EligibilityTable;
pub use error::{StorageError, StorageResult};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::Database;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./coinsensus_data/coinsensus.redb"),
        }
    }
}

/// Main storage interface
pub struct Storage {
    config: StorageConfig,
    pub campaigns: Arc<CampaignStore>,
    pub eligibility: Arc<EligibilityTable>,
}

impl Storage {
    /// Open or create storage at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let config = StorageConfig {
            path: path.as_ref().to_path_buf(),
        };
        Self::with_config(config)
    }

    /// Open storage with custom configuration
    pub fn with_config(config: StorageConfig) -> StorageResult<Self> {
        // Ensure directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Arc::new(Database::create(&config.path)?);
        let campaigns = Arc::new(CampaignStore::new(db.clone())?);
        let eligibility = Arc::new(EligibilityTable::new(db)?);
        info!(path = %config.path.display(), "Storage opened");

        Ok(Self {
            config,
            campaigns,
            eligibility,
        })
    }

    /// Get storage configuration
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Get database statistics
    pub fn stats(&self) -> StorageResult<StorageStats> {
        let mut accepted_votes = 0;
        let campaign_ids = self.campaigns.campaign_ids()?;
        for id in &campaign_ids {
            accepted_votes += self.campaigns.vote_count(*id)?;
        }
        Ok(StorageStats {
            path: self.config.path.clone(),
            campaigns: campaign_ids.len() as u64,
            accepted_votes,
            eligibility_records: self.eligibility.count()?,
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub path: PathBuf,
    pub campaigns: u64,
    pub accepted_votes: u64,
    pub eligibility_records: u64,
}
