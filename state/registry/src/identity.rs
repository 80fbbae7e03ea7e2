//! Voter secrets, identity commitments and per-campaign nullifiers
//!
//! ```text
//! secret_hash = H(SECRET, secret)
//! identity    = H(IDENTITY, secret_hash, voter_id)
//! commitment  = H(COMMITMENT, identity, secret_hash)
//! nullifier   = H(NULLIFIER, secret, campaign_id)
//! ```
//!
//! Only `commitment` is published at registration. The vote nullifier is
//! revealed at vote time. Nothing else leaves the voter.

use std::fmt;

use coinsensus_hash::field::serde_fr;
use coinsensus_hash::{bytes_to_field, field_from_hex, field_to_hex, Domain, Fr, HashFn};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{RegistryError, RegistryResult};

/// Campaign identifiers enter the field as plain integers
pub fn campaign_field(campaign_id: u64) -> Fr {
    Fr::from(campaign_id)
}

/// Voter-scoped identifier derived from an external label (e.g. a wallet address)
pub fn voter_id_from_label(label: &str) -> Fr {
    bytes_to_field(coinsensus_hash::hash(label.as_bytes()).as_slice())
}

/// The voter's private scalar. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VoterSecret([u8; 32]);

impl VoterSecret {
    /// Fresh secret from the OS RNG
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Field representation used by every derivation
    pub fn to_field(&self) -> Fr {
        bytes_to_field(&self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> RegistryResult<Self> {
        let mut bytes = hex::decode(s).map_err(|e| RegistryError::InvalidEncoding(e.to_string()))?;
        if bytes.len() != 32 {
            let len = bytes.len();
            bytes.zeroize();
            return Err(RegistryError::InvalidEncoding(format!(
                "Expected 32 bytes, got {}",
                len
            )));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(arr))
    }
}

impl fmt::Debug for VoterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VoterSecret(<redacted>)")
    }
}

/// A secret together with the voter-scoped identifier it was registered under
#[derive(Clone, Debug)]
pub struct VoterCredential {
    pub secret: VoterSecret,
    pub voter_id: Fr,
}

impl VoterCredential {
    pub fn new(secret: VoterSecret, voter_id: Fr) -> Self {
        Self { secret, voter_id }
    }

    pub fn commitment<H: HashFn + ?Sized>(&self, hasher: &H) -> VoterCommitment {
        VoterCommitment::derive(hasher, &self.secret, self.voter_id)
    }
}

/// `{ secret_hash, nullifier, commitment }` for one registered voter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCommitment {
    #[serde(with = "serde_fr")]
    pub secret_hash: Fr,
    /// Identity nullifier, bound to the voter id rather than a campaign
    #[serde(with = "serde_fr")]
    pub nullifier: Fr,
    #[serde(with = "serde_fr")]
    pub commitment: Fr,
}

impl VoterCommitment {
    pub fn derive<H: HashFn + ?Sized>(hasher: &H, secret: &VoterSecret, voter_id: Fr) -> Self {
        let secret_hash = hasher.hash_tagged(Domain::Secret, &[secret.to_field()]);
        let nullifier = hasher.hash_tagged(Domain::Identity, &[secret_hash, voter_id]);
        let commitment = hasher.hash_tagged(Domain::Commitment, &[nullifier, secret_hash]);
        Self {
            secret_hash,
            nullifier,
            commitment,
        }
    }
}

/// Per-campaign vote nullifier, the double-vote key
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Nullifier(#[serde(with = "serde_fr")] Fr);

impl Nullifier {
    /// nullifier = H(NULLIFIER, secret, campaign_id)
    ///
    /// Independent of the chosen option, distinct across campaigns.
    pub fn derive<H: HashFn + ?Sized>(hasher: &H, secret: &VoterSecret, campaign_id: u64) -> Self {
        Self(hasher.hash_tagged(
            Domain::Nullifier,
            &[secret.to_field(), campaign_field(campaign_id)],
        ))
    }

    pub fn from_field(value: Fr) -> Self {
        Self(value)
    }

    pub fn as_field(&self) -> Fr {
        self.0
    }

    pub fn to_hex(&self) -> String {
        field_to_hex(&self.0)
    }

    pub fn from_hex(s: &str) -> RegistryResult<Self> {
        field_from_hex(s)
            .map(Self)
            .map_err(|e| RegistryError::InvalidEncoding(e.to_string()))
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
