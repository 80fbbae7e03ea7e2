//! Storage errors

use coinsensus_sybil::EligibilityError;
use coinsensus_tally::TallyError;
use thiserror::Error;

/// Storage result type
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Campaign not found: {0}")]
    CampaignNotFound(u64),

    #[error("Campaign already stored: {0}")]
    CampaignExists(u64),

    /// Nullifier already marked for the campaign
    #[error("Nullifier already recorded for campaign {0}")]
    NullifierExists(u64),

    /// Corruption detected
    #[error("Data corruption detected: {0}")]
    Corruption(String),
}

impl From<bincode::Error> for StorageError {
    fn from(e: bincode::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

impl From<StorageError> for TallyError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::CampaignNotFound(id) => TallyError::UnknownCampaign(id),
            StorageError::CampaignExists(id) => TallyError::CampaignExists(id),
            StorageError::NullifierExists(_) => TallyError::DuplicateVote,
            other => TallyError::Store(other.to_string()),
        }
    }
}

impl From<StorageError> for EligibilityError {
    fn from(e: StorageError) -> Self {
        EligibilityError::Store(e.to_string())
    }
}
