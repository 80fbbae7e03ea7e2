//! Error types for registry operations

use thiserror::Error;

/// Errors that can occur while building, freezing or proving against a registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Commitment not registered")]
    NotRegistered,

    #[error("Registry is empty")]
    EmptyRegistry,

    #[error("Registry is frozen")]
    Frozen,

    #[error("Registry is not frozen")]
    NotFrozen,

    #[error("Commitment already registered")]
    DuplicateCommitment,

    #[error("Unknown campaign: {0}")]
    UnknownCampaign(u64),

    #[error("Snapshot root mismatch")]
    RootMismatch,

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
