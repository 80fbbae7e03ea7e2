//! Error types for vote acceptance

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TallyError {
    /// Verification or signal binding failed. Carries the reason only.
    #[error("Invalid proof: {0}")]
    InvalidProof(String),

    /// Nullifier already accepted for this campaign
    #[error("already voted")]
    DuplicateVote,

    #[error("Unknown campaign: {0}")]
    UnknownCampaign(u64),

    #[error("Campaign already open: {0}")]
    CampaignExists(u64),

    #[error("Invalid campaign parameters: {0}")]
    InvalidParams(String),

    #[error("Verification pool error: {0}")]
    WorkerPool(String),

    #[error("Tally store error: {0}")]
    Store(String),
}

pub type TallyResult<T> = Result<T, TallyError>;
