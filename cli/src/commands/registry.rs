//! Registry Commands - Build frozen registries and membership proofs

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use coinsensus_hash::{field_from_hex, field_to_hex, Fr, Poseidon};
use coinsensus_registry::{MembershipProof, RegistrySnapshot, VoterRegistry};
use serde::Serialize;
use tracing::info;

/// Registry operations
#[derive(Args)]
pub struct RegistryCommand {
    #[command(subcommand)]
    action: RegistryAction,
}

#[derive(Subcommand)]
enum RegistryAction {
    /// Build and freeze a registry from a JSON list of hex commitments
    Build {
        /// Input file: `["<hex>", ...]`
        input: PathBuf,

        /// Where to write the snapshot (defaults to `<data-dir>/registries/<campaign>.json`)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Campaign the registry belongs to
        #[arg(long)]
        campaign: u64,
    },

    /// Print a membership proof for a commitment
    Prove {
        /// Snapshot written by `registry build`
        snapshot: PathBuf,

        /// Commitment (hex)
        commitment: String,
    },
}

#[derive(Debug, Serialize)]
struct ProofOutput {
    root: String,
    depth: usize,
    proof: MembershipProof,
}

/// Freeze a registry over `commitments` and return its snapshot
pub fn build_snapshot(commitments: &[String]) -> anyhow::Result<RegistrySnapshot> {
    let mut registry = VoterRegistry::new(Poseidon::new());
    for hex in commitments {
        registry.register(field_from_hex(hex)?)?;
    }
    let root = registry.freeze()?;
    info!(voters = registry.len(), depth = ?registry.depth(), root = %field_to_hex(&root), "Registry frozen");
    Ok(registry.snapshot()?)
}

fn load_snapshot(path: &Path) -> anyhow::Result<VoterRegistry<Poseidon>> {
    let snapshot = RegistrySnapshot::from_json(&fs::read_to_string(path)?)?;
    Ok(VoterRegistry::from_snapshot(Poseidon::new(), &snapshot)?)
}

fn prove(registry: &VoterRegistry<Poseidon>, commitment: &Fr) -> anyhow::Result<ProofOutput> {
    let proof = registry.prove(commitment)?;
    Ok(ProofOutput {
        root: registry.root().map(|r| field_to_hex(&r)).unwrap_or_default(),
        depth: proof.len(),
        proof,
    })
}

impl RegistryCommand {
    pub fn execute(self, data_dir: PathBuf) -> anyhow::Result<()> {
        match self.action {
            RegistryAction::Build { input, out, campaign } => {
                let commitments: Vec<String> = serde_json::from_str(&fs::read_to_string(&input)?)?;
                let snapshot = build_snapshot(&commitments)?;

                let out = out.unwrap_or_else(|| {
                    data_dir.join("registries").join(format!("{}.json", campaign))
                });
                if let Some(parent) = out.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&out, snapshot.to_json()?)?;

                println!("Root:     {}", field_to_hex(&snapshot.root));
                println!("Voters:   {}", snapshot.commitments.len());
                println!("Snapshot: {}", out.display());
            }
            RegistryAction::Prove { snapshot, commitment } => {
                let registry = load_snapshot(&snapshot)?;
                let output = prove(&registry, &field_from_hex(&commitment)?)?;
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
        }
        Ok(())
    }
}
