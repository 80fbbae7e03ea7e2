//! Node errors
//!
//! The taxonomy callers see. Lower layers convert into it; nothing here
//! carries a voter's option or a raw cryptographic detail.

use coinsensus_proof::ProofError;
use coinsensus_registry::RegistryError;
use coinsensus_sybil::EligibilityError;
use coinsensus_tally::TallyError;
use thiserror::Error;

/// Node result type
pub type VotingResult<T> = Result<T, VotingError>;

/// Voting errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VotingError {
    /// Commitment absent from the campaign registry
    #[error("Voter is not registered for this campaign")]
    NotRegistered,

    /// Quadratic constraint violated
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    /// Backend or transient failure
    #[error("Proof generation failed: {0}")]
    ProofGenerationFailed(String),

    #[error("Invalid proof: {0}")]
    InvalidProof(String),

    #[error("already voted")]
    DuplicateVote,

    #[error("Not eligible to vote: {}", .0.join(", "))]
    EligibilityDenied(Vec<String>),

    #[error("Campaign {0} is closed")]
    CampaignClosed(u64),

    #[error("Unknown campaign: {0}")]
    UnknownCampaign(u64),

    /// Collaborator or persistence failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl VotingError {
    /// Whether the same request may succeed later without user changes
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VotingError::ProofGenerationFailed(_) | VotingError::EligibilityDenied(_)
        )
    }
}

impl From<ProofError> for VotingError {
    fn from(e: ProofError) -> Self {
        match e {
            ProofError::InvalidAllocation(msg) => VotingError::InvalidAllocation(msg),
            ProofError::NotRegistered => VotingError::NotRegistered,
            ProofError::InvalidOption { .. } => VotingError::InvalidProof("option out of range".into()),
            ProofError::ProofGenerationFailed(msg) => VotingError::ProofGenerationFailed(msg),
            other => VotingError::ProofGenerationFailed(other.to_string()),
        }
    }
}

impl From<RegistryError> for VotingError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotRegistered => VotingError::NotRegistered,
            RegistryError::UnknownCampaign(id) => VotingError::UnknownCampaign(id),
            other => VotingError::Storage(other.to_string()),
        }
    }
}

impl From<TallyError> for VotingError {
    fn from(e: TallyError) -> Self {
        match e {
            TallyError::InvalidProof(reason) => VotingError::InvalidProof(reason),
            TallyError::DuplicateVote => VotingError::DuplicateVote,
            TallyError::UnknownCampaign(id) => VotingError::UnknownCampaign(id),
            other => VotingError::Storage(other.to_string()),
        }
    }
}

impl From<EligibilityError> for VotingError {
    fn from(e: EligibilityError) -> Self {
        VotingError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classes() {
        assert!(VotingError::ProofGenerationFailed("busy".into()).is_retryable());
        assert!(VotingError::EligibilityDenied(vec!["cooldown active".into()]).is_retryable());
        assert!(!VotingError::NotRegistered.is_retryable());
        assert!(!VotingError::InvalidAllocation("over budget".into()).is_retryable());
        assert!(!VotingError::InvalidProof("bad".into()).is_retryable());
        assert!(!VotingError::DuplicateVote.is_retryable());
    }

    #[test]
    fn test_duplicate_vote_message() {
        let err: VotingError = TallyError::DuplicateVote.into();
        assert_eq!(err.to_string(), "already voted");
    }

    #[test]
    fn test_denial_message_lists_reasons() {
        let err = VotingError::EligibilityDenied(vec![
            "account too new".into(),
            "insufficient balance".into(),
        ]);
        assert_eq!(
            err.to_string(),
            "Not eligible to vote: account too new, insufficient balance"
        );
    }

    #[test]
    fn test_proof_error_mapping() {
        assert_eq!(
            VotingError::from(ProofError::NotRegistered),
            VotingError::NotRegistered
        );
        assert!(matches!(
            VotingError::from(ProofError::InvalidAllocation("x".into())),
            VotingError::InvalidAllocation(_)
        ));
        assert!(matches!(
            VotingError::from(ProofError::SetupError("x".into())),
            VotingError::ProofGenerationFailed(_)
        ));
    }
}
