//! Error types for proof operations

use thiserror::Error;

/// Errors that can occur while building or checking vote proofs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    #[error("Commitment is not a member of the registry")]
    NotRegistered,

    #[error("Option {index} out of range for {options} options")]
    InvalidOption { index: u32, options: u32 },

    #[error("Proof generation failed: {0}")]
    ProofGenerationFailed(String),

    #[error("Proof verification failed: {0}")]
    VerificationFailed(String),

    #[error("Invalid witness: {0}")]
    InvalidWitness(String),

    #[error("Invalid public input: {0}")]
    InvalidPublicInput(String),

    #[error("Unsupported circuit: {0}")]
    UnsupportedCircuit(String),

    #[error("Setup error: {0}")]
    SetupError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type ProofResult<T> = Result<T, ProofError>;
