//! Coinsensus Tally
//!
//! Accepts verified votes per campaign and publishes aggregate results.
//!
//! - [`TallyAggregator::accept_vote`] is the serialization point: verify,
//!   reject reused nullifiers, persist, fold. Async callers split it into
//!   [`TallyAggregator::verify_vote`] and [`TallyAggregator::accept_verified`].
//! - [`TallyDigest`] commits to the sorted set of accepted nullifiers, so
//!   arrival order never changes the published result.
//! - [`TallyStore`] keeps accepted votes durable; [`TallyAggregator::restore`]
//!   rebuilds the nullifier sets after a restart.

pub mod aggregator;
pub mod campaign;
pub mod digest;
pub mod errors;
pub mod store;

use serde::{Deserialize, Serialize};

pub use aggregator::{batch_verify, Accepted, TallyAggregator, VerifiedVote};
pub use campaign::{CampaignKind, CampaignParams};
pub use digest::{compute_tally, NullifierSet, RunningTally, TallyDigest};
pub use errors::{TallyError, TallyResult};
pub use store::{AcceptedVote, MemoryTallyStore, StoredCampaign, TallyStore};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// Dedicated batch-verification threads; 0 uses the global rayon pool
    pub verify_workers: usize,
}
