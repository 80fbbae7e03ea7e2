//! Per-address eligibility records and their store

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::errors::EligibilityResult;
use crate::ledger::Address;

/// Mutable state behind the cooldown and participation-cap rules.
///
/// Created on an address's first eligibility check, updated on every accepted
/// vote, never deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRecord {
    pub last_vote_time: Option<u64>,
    /// Vote before `last_vote_time`, for automation detection
    pub previous_vote_time: Option<u64>,
    pub campaign_participation_count: u32,
    /// Start of the current participation period
    pub period_start: u64,
}

impl EligibilityRecord {
    pub fn new(now: u64) -> Self {
        Self {
            period_start: now,
            ..Default::default()
        }
    }

    fn period_expired(&self, now: u64, period_secs: u64) -> bool {
        now.saturating_sub(self.period_start) >= period_secs
    }

    /// Participation count that applies at `now`; zero once the period rolled over
    pub fn participation_at(&self, now: u64, period_secs: u64) -> u32 {
        if self.period_expired(now, period_secs) {
            0
        } else {
            self.campaign_participation_count
        }
    }

    /// Seconds left before the cooldown elapses, if it has not
    pub fn cooldown_remaining(&self, now: u64, cooldown_secs: u64) -> Option<u64> {
        let last = self.last_vote_time?;
        let elapsed = now.saturating_sub(last);
        (elapsed < cooldown_secs).then(|| cooldown_secs - elapsed)
    }

    pub fn record_vote(&mut self, now: u64, period_secs: u64) {
        if self.period_expired(now, period_secs) {
            self.period_start = now;
            self.campaign_participation_count = 0;
        }
        self.previous_vote_time = self.last_vote_time;
        self.last_vote_time = Some(now);
        self.campaign_participation_count = self.campaign_participation_count.saturating_add(1);
    }
}

/// Record persistence keyed by address
pub trait EligibilityStore: Send + Sync {
    fn load(&self, address: &Address) -> EligibilityResult<Option<EligibilityRecord>>;

    fn save(&self, address: &Address, record: &EligibilityRecord) -> EligibilityResult<()>;
}

#[derive(Default)]
pub struct MemoryEligibilityStore {
    records: DashMap<Address, EligibilityRecord>,
}

impl MemoryEligibilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl EligibilityStore for MemoryEligibilityStore {
    fn load(&self, address: &Address) -> EligibilityResult<Option<EligibilityRecord>> {
        Ok(self.records.get(address).map(|r| *r.value()))
    }

    fn save(&self, address: &Address, record: &EligibilityRecord) -> EligibilityResult<()> {
        self.records.insert(address.clone(), *record);
        Ok(())
    }
}
