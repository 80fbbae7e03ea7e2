//! Secret Command - Generate a voter secret and its commitment

use clap::Args;
use coinsensus_hash::{field_to_hex, Poseidon};
use coinsensus_registry::{voter_id_from_label, VoterCredential, VoterSecret};
use serde::Serialize;

/// Generate a voter secret and the commitment to register
#[derive(Args)]
pub struct SecretCommand {
    /// Label the voter id is derived from, e.g. a wallet address
    #[arg(long)]
    voter: String,

    /// Reuse an existing secret (hex) instead of generating one
    #[arg(long, env = "COINSENSUS_SECRET", hide_env_values = true)]
    secret: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SecretOutput {
    pub secret: String,
    pub voter_id: String,
    pub commitment: String,
}

impl SecretCommand {
    pub fn run(&self) -> anyhow::Result<SecretOutput> {
        let secret = match &self.secret {
            Some(hex) => VoterSecret::from_hex(hex)?,
            None => VoterSecret::random(),
        };
        let voter_id = voter_id_from_label(&self.voter);
        let credential = VoterCredential::new(secret, voter_id);
        let commitment = credential.commitment(&Poseidon::new());

        Ok(SecretOutput {
            secret: credential.secret.to_hex(),
            voter_id: field_to_hex(&voter_id),
            commitment: field_to_hex(&commitment.commitment),
        })
    }

    pub fn execute(self) -> anyhow::Result<()> {
        let output = self.run()?;
        println!("{}", serde_json::to_string_pretty(&output)?);
        eprintln!("Keep the secret private; register only the commitment.");
        Ok(())
    }
}
