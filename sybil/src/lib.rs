//! Coinsensus Sybil Resistance
//!
//! Eligibility gate in front of proof generation, plus advisory reputation
//! and anomaly flags.
//!
//! - Stateless inputs (account age, balance, transaction count) come from a
//!   [`LedgerClient`] under a bounded timeout.
//! - Stateful inputs live in an [`EligibilityRecord`] per address, mutated only
//!   when a vote is accepted.
//! - [`EligibilityEngine::can_vote`] reports every violated rule;
//!   [`EligibilityEngine::reputation_score`] never gates.

pub mod clock;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod record;
pub mod reputation;

use serde::{Deserialize, Serialize};

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{CommitError, DenialReason, EligibilityDecision, EligibilityEngine, SuspicionReport};
pub use errors::{EligibilityError, EligibilityResult};
pub use ledger::{Address, LedgerClient, LedgerProfile, StaticLedger};
pub use record::{EligibilityRecord, EligibilityStore, MemoryEligibilityStore};
pub use reputation::{reputation_score, ReputationWeights};

const DAY_SECS: u64 = 86_400;

/// Eligibility rule thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityConfig {
    pub min_account_age_days: u64,
    pub min_stake: u64,
    pub cooldown_secs: u64,
    /// Votes allowed per participation period
    pub participation_cap: u32,
    pub participation_period_secs: u64,
    /// Votes closer than this are flagged as automated
    pub suspicious_interval_secs: u64,
    pub ledger_timeout_ms: u64,
    pub reputation: ReputationWeights,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            min_account_age_days: 30,
            min_stake: 1,
            cooldown_secs: DAY_SECS,
            participation_cap: 5,
            participation_period_secs: 30 * DAY_SECS,
            suspicious_interval_secs: 60,
            ledger_timeout_ms: 2_000,
            reputation: ReputationWeights::default(),
        }
    }
}

impl EligibilityConfig {
    /// No thresholds beyond a single vote per cooldown; short timeouts
    pub fn testing() -> Self {
        Self {
            min_account_age_days: 0,
            min_stake: 0,
            cooldown_secs: 60,
            participation_cap: 100,
            ledger_timeout_ms: 200,
            ..Self::default()
        }
    }

    pub fn production() -> Self {
        Self {
            ledger_timeout_ms: 5_000,
            ..Self::default()
        }
    }
}
