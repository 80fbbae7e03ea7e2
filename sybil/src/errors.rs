//! Error types for eligibility operations

use thiserror::Error;

/// Errors raised while gathering eligibility inputs or persisting records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EligibilityError {
    #[error("Eligibility data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Ledger request timed out after {0}ms")]
    Timeout(u64),

    #[error("Eligibility store error: {0}")]
    Store(String),
}

pub type EligibilityResult<T> = Result<T, EligibilityError>;
