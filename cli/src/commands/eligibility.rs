//! Eligibility Command - Evaluate the eligibility rules offline

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Args;
use coinsensus_sybil::{
    Address, Clock, EligibilityConfig, EligibilityEngine, EligibilityRecord, EligibilityStore,
    LedgerProfile, ManualClock, MemoryEligibilityStore, StaticLedger, SystemClock,
};
use serde::Serialize;

use crate::config::CoinsensusConfig;

/// Evaluate the eligibility rules for given ledger values
#[derive(Args)]
pub struct EligibilityCommand {
    /// Look the ledger values up in the configured profiles file
    #[arg(long)]
    address: Option<String>,

    /// Account age in days
    #[arg(long, default_value_t = 0)]
    age_days: u64,

    /// Balance in whole units
    #[arg(long, default_value_t = 0)]
    balance: u64,

    /// Transaction count (reputation only)
    #[arg(long, default_value_t = 0)]
    tx_count: u64,

    /// Seconds since the address last voted
    #[arg(long)]
    last_vote_ago: Option<u64>,

    /// Campaigns already joined in the current period
    #[arg(long, default_value_t = 0)]
    participation: u32,
}

#[derive(Debug, Serialize)]
pub struct EligibilityOutput {
    pub allowed: bool,
    pub reasons: Vec<String>,
    pub reputation: f64,
}

const OFFLINE_ADDRESS: &str = "offline";

fn load_profiles(path: &Path) -> anyhow::Result<HashMap<String, LedgerProfile>> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

impl EligibilityCommand {
    fn profile(&self, config: &CoinsensusConfig) -> anyhow::Result<(Address, LedgerProfile)> {
        match &self.address {
            Some(address) => {
                let path = config
                    .ledger
                    .profiles
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("--address needs ledger.profiles in the config"))?;
                let profile = load_profiles(path)?
                    .remove(address)
                    .ok_or_else(|| anyhow::anyhow!("No ledger profile for {}", address))?;
                Ok((Address::new(address.as_str()), profile))
            }
            None => Ok((
                Address::new(OFFLINE_ADDRESS),
                LedgerProfile {
                    account_age_days: self.age_days,
                    balance: self.balance,
                    transaction_count: self.tx_count,
                },
            )),
        }
    }

    fn record(&self, now: u64, rules: &EligibilityConfig) -> EligibilityRecord {
        let mut record = EligibilityRecord::new(now.saturating_sub(rules.participation_period_secs / 2));
        record.last_vote_time = self.last_vote_ago.map(|ago| now.saturating_sub(ago));
        record.campaign_participation_count = self.participation;
        record
    }

    pub async fn run(&self, config: &CoinsensusConfig) -> anyhow::Result<EligibilityOutput> {
        let (address, profile) = self.profile(config)?;
        let now = SystemClock.now();

        let ledger = Arc::new(StaticLedger::new());
        ledger.set(address.clone(), profile);
        let records = Arc::new(MemoryEligibilityStore::new());
        records.save(&address, &self.record(now, &config.eligibility))?;

        let engine = EligibilityEngine::new(
            config.eligibility.clone(),
            ledger,
            records,
            Arc::new(ManualClock::new(now)),
        );
        let decision = engine.can_vote(&address, 0).await?;
        let reputation = engine.reputation_score(&address).await?;

        Ok(EligibilityOutput {
            allowed: decision.allowed,
            reasons: decision.reason_strings(),
            reputation,
        })
    }

    pub async fn execute(self, config: &CoinsensusConfig) -> anyhow::Result<()> {
        let output = self.run(config).await?;
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn command() -> EligibilityCommand {
        EligibilityCommand {
            address: None,
            age_days: 90,
            balance: 5,
            tx_count: 100,
            last_vote_ago: None,
            participation: 0,
        }
    }

    #[tokio::test]
    async fn test_eligible_profile() {
        let output = command().run(&CoinsensusConfig::default()).await.unwrap();
        assert!(output.allowed);
        assert!(output.reasons.is_empty());
        assert!(output.reputation > 70.0);
    }

    #[tokio::test]
    async fn test_denials_listed() {
        let cmd = EligibilityCommand {
            age_days: 3,
            last_vote_ago: Some(3_600),
            participation: 5,
            ..command()
        };
        let output = cmd.run(&CoinsensusConfig::default()).await.unwrap();
        assert!(!output.allowed);
        assert_eq!(output.reasons.len(), 3);
        assert_eq!(output.reasons[0], "account too new");
        assert_eq!(output.reasons[2], "participation cap reached");
    }

    #[tokio::test]
    async fn test_profile_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        fs::write(
            &path,
            r#"{"0xpoor": {"account_age_days": 400, "balance": 0, "transaction_count": 9}}"#,
        )
        .unwrap();

        let mut config = CoinsensusConfig::default();
        config.ledger.profiles = Some(path);
        let cmd = EligibilityCommand {
            address: Some("0xpoor".into()),
            ..command()
        };
        let output = cmd.run(&config).await.unwrap();
        assert_eq!(output.reasons, vec!["insufficient balance"]);

        let cmd = EligibilityCommand {
            address: Some("0xmissing".into()),
            ..command()
        };
        assert!(cmd.run(&config).await.is_err());
    }
}
