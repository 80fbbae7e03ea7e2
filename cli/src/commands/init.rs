//! Init Command - Initialize a data directory

use std::fs;
use std::path::PathBuf;

use clap::Args;
use coinsensus_proof::ProverConfig;
use tracing::info;

use crate::config::{default_config_path, CoinsensusConfig};

/// Initialize a data directory with a default configuration
#[derive(Args)]
pub struct InitCommand {
    /// Write relaxed eligibility rules and small circuits
    #[arg(long)]
    testing: bool,

    /// Force overwrite existing configuration
    #[arg(short, long)]
    force: bool,
}

impl InitCommand {
    pub fn execute(self, data_dir: PathBuf) -> anyhow::Result<()> {
        let config_path = default_config_path(&data_dir);
        info!("Data directory: {}", data_dir.display());

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "Already initialized at {}. Use --force to overwrite.",
                data_dir.display()
            );
        }

        fs::create_dir_all(data_dir.join("db"))?;
        fs::create_dir_all(data_dir.join("registries"))?;

        let config = if self.testing {
            CoinsensusConfig::testing(&data_dir)
        } else {
            CoinsensusConfig {
                prover: ProverConfig::generated(),
                ..CoinsensusConfig::for_data_dir(&data_dir)
            }
        };
        config.save(&config_path)?;
        info!("Configuration saved to {}", config_path.display());

        println!("Initialized {}", data_dir.display());
        println!("Configuration: {}", config_path.display());
        println!("Database:      {}", config.storage.path.display());
        Ok(())
    }
}
