//! Campaign-keyed registry store
//!
//! Each campaign's registry sits behind its own lock; registrations for
//! different campaigns never contend.

use std::sync::Arc;

use coinsensus_hash::{Fr, HashFn};
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::errors::{RegistryError, RegistryResult};
use crate::merkle::MembershipProof;
use crate::registry::{RegistrySnapshot, VoterRegistry};

/// Registry lifecycle per campaign
pub trait RegistryStore: Send + Sync {
    /// Open an empty registry. Reopening an existing campaign is a no-op.
    fn open(&self, campaign_id: u64);

    fn register(&self, campaign_id: u64, commitment: Fr) -> RegistryResult<usize>;

    fn freeze(&self, campaign_id: u64) -> RegistryResult<Fr>;

    /// Frozen root, if the campaign is frozen
    fn root(&self, campaign_id: u64) -> RegistryResult<Option<Fr>>;

    fn depth(&self, campaign_id: u64) -> RegistryResult<Option<usize>>;

    fn prove(&self, campaign_id: u64, commitment: &Fr) -> RegistryResult<MembershipProof>;

    fn snapshot(&self, campaign_id: u64) -> RegistryResult<RegistrySnapshot>;

    /// Install a frozen registry from a snapshot, replacing any open one
    fn import(&self, campaign_id: u64, snapshot: &RegistrySnapshot) -> RegistryResult<Fr>;
}

/// In-memory [`RegistryStore`]
pub struct MemoryRegistryStore<H> {
    hasher: H,
    registries: DashMap<u64, Arc<RwLock<VoterRegistry<H>>>>,
}

impl<H: HashFn + Clone> MemoryRegistryStore<H> {
    pub fn new(hasher: H) -> Self {
        Self {
            hasher,
            registries: DashMap::new(),
        }
    }

    fn get(&self, campaign_id: u64) -> RegistryResult<Arc<RwLock<VoterRegistry<H>>>> {
        self.registries
            .get(&campaign_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(RegistryError::UnknownCampaign(campaign_id))
    }
}

impl<H: HashFn + Clone> RegistryStore for MemoryRegistryStore<H> {
    fn open(&self, campaign_id: u64) {
        self.registries
            .entry(campaign_id)
            .or_insert_with(|| Arc::new(RwLock::new(VoterRegistry::new(self.hasher.clone()))));
    }

    fn register(&self, campaign_id: u64, commitment: Fr) -> RegistryResult<usize> {
        self.get(campaign_id)?.write().register(commitment)
    }

    fn freeze(&self, campaign_id: u64) -> RegistryResult<Fr> {
        self.get(campaign_id)?.write().freeze()
    }

    fn root(&self, campaign_id: u64) -> RegistryResult<Option<Fr>> {
        Ok(self.get(campaign_id)?.read().root())
    }

    fn depth(&self, campaign_id: u64) -> RegistryResult<Option<usize>> {
        Ok(self.get(campaign_id)?.read().depth())
    }

    fn prove(&self, campaign_id: u64, commitment: &Fr) -> RegistryResult<MembershipProof> {
        self.get(campaign_id)?.read().prove(commitment)
    }

    fn snapshot(&self, campaign_id: u64) -> RegistryResult<RegistrySnapshot> {
        self.get(campaign_id)?.read().snapshot()
    }

    fn import(&self, campaign_id: u64, snapshot: &RegistrySnapshot) -> RegistryResult<Fr> {
        let registry = VoterRegistry::from_snapshot(self.hasher.clone(), snapshot)?;
        let root = snapshot.root;
        self.registries
            .insert(campaign_id, Arc::new(RwLock::new(registry)));
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinsensus_hash::Blake3Field;

    #[test]
    fn test_campaigns_are_independent() {
        let store = MemoryRegistryStore::new(Blake3Field);
        store.open(1);
        store.open(2);

        store.register(1, Fr::from(10u64)).unwrap();
        store.register(2, Fr::from(10u64)).unwrap();
        store.register(2, Fr::from(11u64)).unwrap();

        let r1 = store.freeze(1).unwrap();
        assert_eq!(store.root(2).unwrap(), None);
        let r2 = store.freeze(2).unwrap();
        assert_ne!(r1, r2);
        assert_eq!(store.depth(1).unwrap(), Some(0));
        assert_eq!(store.depth(2).unwrap(), Some(1));
    }

    #[test]
    fn test_unknown_campaign() {
        let store = MemoryRegistryStore::new(Blake3Field);
        assert_eq!(
            store.register(5, Fr::from(1u64)),
            Err(RegistryError::UnknownCampaign(5))
        );
    }

    #[test]
    fn test_import_snapshot() {
        let store = MemoryRegistryStore::new(Blake3Field);
        store.open(1);
        for i in 0..3u64 {
            store.register(1, Fr::from(i)).unwrap();
        }
        let root = store.freeze(1).unwrap();
        let snapshot = store.snapshot(1).unwrap();

        let other = MemoryRegistryStore::new(Blake3Field);
        assert_eq!(other.import(7, &snapshot).unwrap(), root);
        assert!(other.prove(7, &Fr::from(2u64)).is_ok());
    }
}
