//! Tally Command - Print the stored digest of a campaign

use std::sync::Arc;

use clap::Args;
use coinsensus_storage::Storage;
use coinsensus_tally::{TallyAggregator, TallyConfig, TallyDigest};

use crate::config::CoinsensusConfig;

/// Print the tally digest of a campaign from the local database
#[derive(Args)]
pub struct TallyCommand {
    /// Campaign id
    campaign: u64,

    /// Also print database statistics
    #[arg(long)]
    stats: bool,
}

impl TallyCommand {
    pub fn run(&self, storage: &Storage, config: &CoinsensusConfig) -> anyhow::Result<TallyDigest> {
        // Replays stored signals only; no circuit setup happens here
        let aggregator = TallyAggregator::restore(
            Arc::new(config.prover.backend()?),
            storage.campaigns.clone(),
            &TallyConfig { verify_workers: 0 },
        )?;
        Ok(aggregator.get_tally(self.campaign)?)
    }

    pub fn execute(self, config: &CoinsensusConfig) -> anyhow::Result<()> {
        let storage = Storage::with_config(config.storage.clone())?;
        let digest = self.run(&storage, config)?;
        println!("{}", serde_json::to_string_pretty(&digest)?);

        if self.stats {
            let stats = storage.stats()?;
            println!();
            println!("Database:  {}", stats.path.display());
            println!("Campaigns: {}", stats.campaigns);
            println!("Votes:     {}", stats.accepted_votes);
            println!("Records:   {}", stats.eligibility_records);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinsensus_proof::ProverConfig;
    use coinsensus_storage::StorageConfig;
    use tempfile::tempdir;

    fn config_in(dir: &std::path::Path, prover: ProverConfig) -> CoinsensusConfig {
        CoinsensusConfig {
            storage: StorageConfig {
                path: dir.join("coinsensus.redb"),
            },
            prover,
            ..Default::default()
        }
    }

    #[test]
    fn test_unknown_campaign() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path(), ProverConfig::testing());
        let storage = Storage::with_config(config.storage.clone()).unwrap();
        let cmd = TallyCommand {
            campaign: 42,
            stats: false,
        };
        let err = cmd.run(&storage, &config).unwrap_err();
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_missing_setup_seed() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path(), ProverConfig::default());
        let storage = Storage::with_config(config.storage.clone()).unwrap();
        let cmd = TallyCommand {
            campaign: 1,
            stats: false,
        };
        let err = cmd.run(&storage, &config).unwrap_err();
        assert!(err.to_string().contains("setup seed"));
    }
}
