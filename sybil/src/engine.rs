//! Eligibility gate
//!
//! [`EligibilityEngine::can_vote`] evaluates every rule and reports all
//! violations. Records are only mutated through [`EligibilityEngine::record_vote`]
//! and [`EligibilityEngine::commit_vote`], both serialized per address. A
//! per-address lock lives only while some task holds or awaits it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::clock::Clock;
use crate::errors::{EligibilityError, EligibilityResult};
use crate::ledger::{Address, LedgerClient, LedgerProfile};
use crate::record::{EligibilityRecord, EligibilityStore};
use crate::reputation::reputation_score;
use crate::EligibilityConfig;

/// A failed eligibility rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialReason {
    AccountTooNew { age_days: u64, required: u64 },
    InsufficientBalance { balance: u64, required: u64 },
    CooldownActive { remaining_secs: u64 },
    ParticipationCapReached { count: u32, cap: u32 },
    DataUnavailable,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::AccountTooNew { .. } => f.write_str("account too new"),
            DenialReason::InsufficientBalance { .. } => f.write_str("insufficient balance"),
            DenialReason::CooldownActive { remaining_secs } => {
                let minutes = remaining_secs.div_ceil(60);
                write!(f, "cooldown active ({}h {}m remaining)", minutes / 60, minutes % 60)
            }
            DenialReason::ParticipationCapReached { .. } => f.write_str("participation cap reached"),
            DenialReason::DataUnavailable => f.write_str("eligibility data unavailable"),
        }
    }
}

/// Outcome of [`EligibilityEngine::can_vote`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityDecision {
    pub allowed: bool,
    /// Violated rules in evaluation order: age, balance, cooldown, cap
    pub reasons: Vec<DenialReason>,
}

impl EligibilityDecision {
    fn from_reasons(reasons: Vec<DenialReason>) -> Self {
        Self {
            allowed: reasons.is_empty(),
            reasons,
        }
    }

    pub fn reason_strings(&self) -> Vec<String> {
        self.reasons.iter().map(ToString::to_string).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspicionReport {
    pub suspicious: bool,
    pub reasons: Vec<String>,
}

/// Failure of [`EligibilityEngine::commit_vote`]
#[derive(Debug, thiserror::Error)]
pub enum CommitError<E> {
    #[error("eligibility denied: {0:?}")]
    Denied(Vec<DenialReason>),

    #[error("vote rejected")]
    Rejected(E),

    #[error(transparent)]
    Store(#[from] EligibilityError),
}

pub struct EligibilityEngine {
    config: EligibilityConfig,
    ledger: Arc<dyn LedgerClient>,
    store: Arc<dyn EligibilityStore>,
    clock: Arc<dyn Clock>,
    locks: DashMap<Address, Arc<Mutex<()>>>,
}

impl EligibilityEngine {
    pub fn new(
        config: EligibilityConfig,
        ledger: Arc<dyn LedgerClient>,
        store: Arc<dyn EligibilityStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            ledger,
            store,
            clock,
            locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &EligibilityConfig {
        &self.config
    }

    fn lock_for(&self, address: &Address) -> Arc<Mutex<()>> {
        self.locks
            .entry(address.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` under the address lock, then drop the lock entry if no other
    /// task holds a handle to it
    async fn serialized<R>(&self, address: &Address, f: impl FnOnce() -> R) -> R {
        let lock = self.lock_for(address);
        let result = {
            let _guard = lock.lock().await;
            f()
        };
        drop(lock);
        self.locks.remove_if(address, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.ledger_timeout_ms)
    }

    /// Age and balance, or `None` when the ledger failed or timed out
    async fn fetch_stateless(&self, address: &Address) -> Option<(u64, u64)> {
        let lookup = async {
            tokio::try_join!(
                self.ledger.account_age_days(address),
                self.ledger.balance(address)
            )
        };
        match tokio::time::timeout(self.timeout(), lookup).await {
            Ok(Ok(values)) => Some(values),
            Ok(Err(e)) => {
                warn!(%address, error = %e, "Ledger lookup failed");
                None
            }
            Err(_) => {
                warn!(%address, timeout_ms = self.config.ledger_timeout_ms, "Ledger lookup timed out");
                None
            }
        }
    }

    fn load_or_create(&self, address: &Address, now: u64) -> EligibilityResult<EligibilityRecord> {
        match self.store.load(address)? {
            Some(record) => Ok(record),
            None => {
                let record = EligibilityRecord::new(now);
                self.store.save(address, &record)?;
                Ok(record)
            }
        }
    }

    fn stateful_reasons(&self, record: &EligibilityRecord, now: u64) -> Vec<DenialReason> {
        let mut reasons = Vec::new();
        if let Some(remaining_secs) = record.cooldown_remaining(now, self.config.cooldown_secs) {
            reasons.push(DenialReason::CooldownActive { remaining_secs });
        }
        let count = record.participation_at(now, self.config.participation_period_secs);
        if count >= self.config.participation_cap {
            reasons.push(DenialReason::ParticipationCapReached {
                count,
                cap: self.config.participation_cap,
            });
        }
        reasons
    }

    /// Evaluate every rule for `address`; creates its record on first check
    pub async fn can_vote(
        &self,
        address: &Address,
        campaign_id: u64,
    ) -> EligibilityResult<EligibilityDecision> {
        let mut reasons = Vec::new();

        match self.fetch_stateless(address).await {
            Some((age_days, balance)) => {
                if age_days < self.config.min_account_age_days {
                    reasons.push(DenialReason::AccountTooNew {
                        age_days,
                        required: self.config.min_account_age_days,
                    });
                }
                if balance < self.config.min_stake {
                    reasons.push(DenialReason::InsufficientBalance {
                        balance,
                        required: self.config.min_stake,
                    });
                }
            }
            None => reasons.push(DenialReason::DataUnavailable),
        }

        let stateful = self
            .serialized(address, || {
                let now = self.clock.now();
                let record = self.load_or_create(address, now)?;
                Ok::<_, EligibilityError>(self.stateful_reasons(&record, now))
            })
            .await?;
        reasons.extend(stateful);

        let decision = EligibilityDecision::from_reasons(reasons);
        if !decision.allowed {
            debug!(%address, campaign_id, reasons = ?decision.reason_strings(), "Eligibility denied");
        }
        Ok(decision)
    }

    /// Record an accepted vote for `address`
    pub async fn record_vote(&self, address: &Address) -> EligibilityResult<()> {
        self.serialized(address, || {
            let now = self.clock.now();
            let mut record = self.load_or_create(address, now)?;
            record.record_vote(now, self.config.participation_period_secs);
            self.store.save(address, &record)
        })
        .await
    }

    /// Re-check the stateful rules, record the vote and run `accept`, all
    /// while holding the address lock.
    ///
    /// The record is saved before `accept` runs and restored if it fails, so
    /// `accept` never takes effect without a persisted record and a rejected
    /// vote leaves the record as it was.
    pub async fn commit_vote<T, E, F>(&self, address: &Address, accept: F) -> Result<T, CommitError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.serialized(address, || {
            let now = self.clock.now();
            let previous = self.load_or_create(address, now)?;

            let reasons = self.stateful_reasons(&previous, now);
            if !reasons.is_empty() {
                debug!(%address, "Vote commit denied");
                return Err(CommitError::Denied(reasons));
            }

            let mut record = previous;
            record.record_vote(now, self.config.participation_period_secs);
            self.store.save(address, &record)?;

            accept().map_err(|e| {
                if let Err(restore) = self.store.save(address, &previous) {
                    error!(%address, error = %restore, "Failed to restore eligibility record after rejected vote");
                }
                CommitError::Rejected(e)
            })
        })
        .await
    }

    pub async fn ledger_profile(&self, address: &Address) -> EligibilityResult<LedgerProfile> {
        let lookup = async {
            tokio::try_join!(
                self.ledger.account_age_days(address),
                self.ledger.balance(address),
                self.ledger.transaction_count(address)
            )
        };
        let (account_age_days, balance, transaction_count) =
            tokio::time::timeout(self.timeout(), lookup)
                .await
                .map_err(|_| EligibilityError::Timeout(self.config.ledger_timeout_ms))??;
        Ok(LedgerProfile {
            account_age_days,
            balance,
            transaction_count,
        })
    }

    /// Advisory score in [0, 100]; never consulted by [`Self::can_vote`]
    pub async fn reputation_score(&self, address: &Address) -> EligibilityResult<f64> {
        let profile = self.ledger_profile(address).await?;
        Ok(reputation_score(&profile, &self.config.reputation))
    }

    pub fn detect_suspicious(&self, address: &Address) -> EligibilityResult<SuspicionReport> {
        let mut reasons = Vec::new();
        if let Some(record) = self.store.load(address)? {
            if let (Some(last), Some(previous)) = (record.last_vote_time, record.previous_vote_time) {
                let gap = last.saturating_sub(previous);
                if gap < self.config.suspicious_interval_secs {
                    reasons.push(format!("votes {}s apart", gap));
                }
            }
            let limit = self.config.participation_cap.saturating_mul(2);
            if record.campaign_participation_count > limit {
                reasons.push(format!(
                    "participation count {} exceeds {}",
                    record.campaign_participation_count, limit
                ));
            }
        }

        let suspicious = !reasons.is_empty();
        if suspicious {
            warn!(%address, ?reasons, "Suspicious voting activity");
        }
        Ok(SuspicionReport { suspicious, reasons })
    }
}
