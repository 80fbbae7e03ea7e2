//! Coinsensus CLI
//!
//! Offline tooling around the voting core.
//!
//! # Usage
//!
//! ```bash
//! # Create a data directory with a default config
//! coinsensus init
//!
//! # Generate a voter secret and the commitment to register
//! coinsensus secret --voter 0xabc
//!
//! # Freeze a registry and prove membership
//! coinsensus registry build commitments.json --campaign 1
//! coinsensus registry prove registries/1.json <commitment>
//!
//! # Check the eligibility rules for some ledger values
//! coinsensus eligibility --age-days 45 --balance 2
//!
//! # Print a campaign's tally digest
//! coinsensus tally 1
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod logging;

use commands::{EligibilityCommand, InitCommand, RegistryCommand, SecretCommand, TallyCommand};
use config::{default_data_dir, CoinsensusConfig};

/// Privacy-preserving, Sybil-resistant voting tools
#[derive(Parser)]
#[command(name = "coinsensus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Privacy-preserving, Sybil-resistant voting tools", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory
    #[arg(short, long, global = true, env = "COINSENSUS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a data directory
    Init(InitCommand),

    /// Generate a voter secret and commitment
    Secret(SecretCommand),

    /// Registry operations
    Registry(RegistryCommand),

    /// Evaluate eligibility rules offline
    Eligibility(EligibilityCommand),

    /// Print a campaign's tally digest
    Tally(TallyCommand),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);

    let config = match cli.command {
        Commands::Init(_) | Commands::Version => CoinsensusConfig::for_data_dir(&data_dir),
        _ => config::resolve(cli.config.as_deref(), &data_dir)?,
    };

    let mut log_settings = config.logging.clone();
    if let Some(level) = cli.log_level {
        log_settings.level = level;
    }
    logging::init(&log_settings, cli.json_logs)?;

    match cli.command {
        Commands::Init(cmd) => cmd.execute(data_dir),
        Commands::Secret(cmd) => cmd.execute(),
        Commands::Registry(cmd) => cmd.execute(data_dir),
        Commands::Eligibility(cmd) => cmd.execute(&config).await,
        Commands::Tally(cmd) => cmd.execute(&config),
        Commands::Version => {
            println!("coinsensus {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
