//! Ledger-query collaborator
//!
//! Account age, balance and transaction history live outside the core. The
//! engine reaches them through [`LedgerClient`] under a bounded timeout.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::errors::{EligibilityError, EligibilityResult};

/// Wallet address as reported by the ledger
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn account_age_days(&self, address: &Address) -> EligibilityResult<u64>;

    async fn balance(&self, address: &Address) -> EligibilityResult<u64>;

    async fn transaction_count(&self, address: &Address) -> EligibilityResult<u64>;
}

/// The three ledger facts the engine consumes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerProfile {
    pub account_age_days: u64,
    pub balance: u64,
    pub transaction_count: u64,
}

/// Ledger backed by a fixed table, for offline evaluation and fixtures
#[derive(Default)]
pub struct StaticLedger {
    profiles: DashMap<Address, LedgerProfile>,
    latency: Option<Duration>,
}

impl StaticLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response, e.g. to exercise timeouts
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set(&self, address: Address, profile: LedgerProfile) {
        self.profiles.insert(address, profile);
    }

    async fn profile(&self, address: &Address) -> EligibilityResult<LedgerProfile> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.profiles
            .get(address)
            .map(|p| *p.value())
            .ok_or_else(|| EligibilityError::DataUnavailable(format!("no ledger entry for {}", address)))
    }
}

#[async_trait]
impl LedgerClient for StaticLedger {
    async fn account_age_days(&self, address: &Address) -> EligibilityResult<u64> {
        Ok(self.profile(address).await?.account_age_days)
    }

    async fn balance(&self, address: &Address) -> EligibilityResult<u64> {
        Ok(self.profile(address).await?.balance)
    }

    async fn transaction_count(&self, address: &Address) -> EligibilityResult<u64> {
        Ok(self.profile(address).await?.transaction_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_ledger_lookup() {
        let ledger = StaticLedger::new();
        let addr = Address::from("addr1");
        ledger.set(
            addr.clone(),
            LedgerProfile {
                account_age_days: 40,
                balance: 7,
                transaction_count: 12,
            },
        );
        assert_eq!(ledger.account_age_days(&addr).await.unwrap(), 40);
        assert_eq!(ledger.balance(&addr).await.unwrap(), 7);
        assert_eq!(ledger.transaction_count(&addr).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_unknown_address() {
        let ledger = StaticLedger::new();
        assert!(matches!(
            ledger.balance(&Address::from("nobody")).await,
            Err(EligibilityError::DataUnavailable(_))
        ));
    }
}
