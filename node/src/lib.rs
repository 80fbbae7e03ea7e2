//! Coinsensus voting service
//!
//! Wires the registry, eligibility engine, prover and tally aggregator into a
//! single vote submission path.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       VotingService                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌─────────────┐   ┌──────────────┐         │
//! │  │  Campaign  │   │ Eligibility │   │   Registry   │         │
//! │  │ Directory  │──▶│   Engine    │──▶│    Store     │         │
//! │  └────────────┘   └─────────────┘   └──────────────┘         │
//! │                                            │                 │
//! │                   ┌────────────────────────▼──────┐          │
//! │                   │   VoteProver (blocking pool)  │          │
//! │                   └────────────────────────┬──────┘          │
//! │                                            │                 │
//! │  ┌─────────────────────────────────────────▼──────────────┐  │
//! │  │  commit: eligibility record + tally accept (atomic)    │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod directory;
mod error;
mod service;

pub use directory::{AcceptedVoteInfo, CampaignDirectory, CampaignInfo, DirectoryError, MemoryCampaignDirectory};
pub use error::{VotingError, VotingResult};
pub use service::{Ballot, VoteRequest, VotingService};

use serde::{Deserialize, Serialize};

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Proofs generated concurrently on the blocking pool
    pub max_concurrent_proofs: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_concurrent_proofs: 4,
        }
    }
}

impl ServiceConfig {
    /// Single prover slot
    pub fn testing() -> Self {
        Self {
            max_concurrent_proofs: 1,
        }
    }

    /// One prover slot per core
    pub fn production() -> Self {
        Self {
            max_concurrent_proofs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_presets() {
        assert_eq!(ServiceConfig::testing().max_concurrent_proofs, 1);
        assert!(ServiceConfig::production().max_concurrent_proofs >= 1);
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: ServiceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ServiceConfig::default());
    }
}
