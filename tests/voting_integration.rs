//! End-to-end voting flows over the Groth16 backend and redb storage

use std::path::Path;
use std::sync::Arc;

use coinsensus::prelude::*;
use coinsensus::proof::{SIGNAL_ANCHOR, SIGNAL_QUADRATIC_ROOT};
use coinsensus::sybil::{ManualClock, StaticLedger};
use tempfile::tempdir;

const START: u64 = 1_700_000_000;
const DAY: u64 = 86_400;
const STANDARD: u64 = 1;
const QUADRATIC: u64 = 2;
const SECOND_STANDARD: u64 = 3;

struct Deployment {
    service: VotingService<Groth16Backend>,
    storage: Arc<Storage>,
    clock: Arc<ManualClock>,
    voters: Vec<(Address, VoterCredential)>,
}

fn voters() -> Vec<(Address, VoterCredential)> {
    (0..4u8)
        .map(|i| {
            (
                Address::new(format!("0xvoter{}", i)),
                VoterCredential::new(VoterSecret::from_bytes([i + 11; 32]), Fr::from(100 + i as u64)),
            )
        })
        .collect()
}

fn deploy(db: &Path, clock: Arc<ManualClock>) -> Deployment {
    let backend = Arc::new(ProverConfig::testing().backend().unwrap());
    let hasher = Poseidon::new();
    let voters = voters();

    let ledger = Arc::new(StaticLedger::new());
    let registries = Arc::new(MemoryRegistryStore::new(hasher.clone()));
    let directory = Arc::new(MemoryCampaignDirectory::new());
    for campaign_id in [STANDARD, QUADRATIC, SECOND_STANDARD] {
        registries.open(campaign_id);
        for (_, credential) in &voters {
            registries
                .register(campaign_id, credential.commitment(&hasher).commitment)
                .unwrap();
        }
        registries.freeze(campaign_id).unwrap();
        directory.upsert(
            campaign_id,
            CampaignInfo {
                options: 3,
                end_time: START + 60 * DAY,
                is_active: true,
            },
        );
    }
    for (address, _) in &voters {
        ledger.set(
            address.clone(),
            LedgerProfile {
                account_age_days: 120,
                balance: 4,
                transaction_count: 40,
            },
        );
    }

    let storage = Arc::new(Storage::open(db).unwrap());
    let eligibility = Arc::new(EligibilityEngine::new(
        EligibilityConfig::default(),
        ledger,
        storage.eligibility.clone(),
        clock.clone(),
    ));
    let tally = Arc::new(
        TallyAggregator::restore(backend, storage.campaigns.clone(), &TallyConfig::default()).unwrap(),
    );
    let service = VotingService::new(
        &ServiceConfig::testing(),
        registries,
        eligibility,
        tally,
        directory,
        clock.clone(),
    );

    Deployment {
        service,
        storage,
        clock,
        voters,
    }
}

impl Deployment {
    fn request(&self, voter: usize, ballot: Ballot) -> VoteRequest {
        let (address, credential) = &self.voters[voter];
        VoteRequest {
            address: address.clone(),
            credential: credential.clone(),
            ballot,
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn standard_vote_survives_restart() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("coinsensus.redb");
    let clock = Arc::new(ManualClock::new(START));

    let (digest, first_nullifier) = {
        let d = deploy(&db, clock.clone());
        d.service.open_standard_campaign(STANDARD, 3).unwrap();

        let first = d
            .service
            .submit_vote(STANDARD, d.request(0, Ballot::Standard { option: 1 }))
            .await
            .unwrap();
        d.service
            .submit_vote(STANDARD, d.request(1, Ballot::Standard { option: 1 }))
            .await
            .unwrap();

        d.clock.advance(DAY);
        let err = d
            .service
            .submit_vote(STANDARD, d.request(0, Ballot::Standard { option: 2 }))
            .await
            .unwrap_err();
        assert_eq!(err, VotingError::DuplicateVote);

        let digest = d.service.get_tally(STANDARD).unwrap();
        assert_eq!(digest.accepted_count, 2);
        assert_eq!(digest.option_counts, vec![0, 2, 0]);
        assert_eq!(d.storage.stats().unwrap().accepted_votes, 2);
        (digest, first.nullifier)
    };

    let d = deploy(&db, clock);
    assert_eq!(d.service.get_tally(STANDARD).unwrap(), digest);
    assert!(digest.tally_hash != Fr::from(0u64));

    // Restored nullifier set still blocks the first voter
    d.clock.advance(DAY);
    let err = d
        .service
        .submit_vote(STANDARD, d.request(0, Ballot::Standard { option: 0 }))
        .await
        .unwrap_err();
    assert_eq!(err, VotingError::DuplicateVote);

    let other = d
        .service
        .submit_vote(STANDARD, d.request(2, Ballot::Standard { option: 0 }))
        .await
        .unwrap();
    assert_ne!(other.nullifier, first_nullifier);
    assert_eq!(other.accepted_count, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn eligibility_records_survive_restart() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("coinsensus.redb");
    let clock = Arc::new(ManualClock::new(START));

    {
        let d = deploy(&db, clock.clone());
        d.service.open_standard_campaign(STANDARD, 3).unwrap();
        d.service
            .submit_vote(STANDARD, d.request(3, Ballot::Standard { option: 2 }))
            .await
            .unwrap();
    }

    let d = deploy(&db, clock);
    let decision = d
        .service
        .check_eligibility(&d.voters[3].0, SECOND_STANDARD)
        .await
        .unwrap();
    assert!(!decision.allowed);
    assert!(decision.reason_strings()[0].starts_with("cooldown active"));
}

#[tokio::test(flavor = "multi_thread")]
async fn quadratic_vote_end_to_end() {
    let dir = tempdir().unwrap();
    let d = deploy(&dir.path().join("coinsensus.redb"), Arc::new(ManualClock::new(START)));
    d.service.open_quadratic_campaign(QUADRATIC, 3, 9).unwrap();

    d.service
        .submit_vote(QUADRATIC, d.request(0, Ballot::Quadratic { weights: vec![2, 2, 0] }))
        .await
        .unwrap();

    let err = d
        .service
        .submit_vote(QUADRATIC, d.request(1, Ballot::Quadratic { weights: vec![3, 1, 0] }))
        .await
        .unwrap_err();
    assert!(matches!(err, VotingError::InvalidAllocation(_)));

    // A genuine proof with an inflated budget no longer verifies
    let hasher = Poseidon::new();
    let leaves: Vec<Fr> = d
        .voters
        .iter()
        .map(|(_, c)| c.commitment(&hasher).commitment)
        .collect();
    let tree = MerkleTree::build(&hasher, &leaves).unwrap();
    let membership = tree.prove(&leaves[2]).unwrap();
    let prover = d.service.tally().prover();
    let mut proof = prover
        .generate_quadratic_proof(&d.voters[2].1, &[1, 1, 1], 9, QUADRATIC, &membership, tree.root())
        .unwrap();
    proof.public_signals[SIGNAL_ANCHOR] = Fr::from(100u64);
    let err = d
        .service
        .submit_proof(QUADRATIC, &d.voters[2].0, &proof)
        .await
        .unwrap_err();
    assert!(matches!(err, VotingError::InvalidProof(_)));

    let digest = d.service.get_tally(QUADRATIC).unwrap();
    assert_eq!(digest.accepted_count, 1);
    assert_eq!(digest.rejected_count, 1);
    assert_eq!(digest.credits_allotted, 9);
}

#[tokio::test(flavor = "multi_thread")]
async fn quadratic_vote_needs_campaign_registry() {
    let dir = tempdir().unwrap();
    let d = deploy(&dir.path().join("coinsensus.redb"), Arc::new(ManualClock::new(START)));
    let params = d.service.open_quadratic_campaign(QUADRATIC, 3, 9).unwrap();
    let hasher = Poseidon::new();

    // Outsider proves membership of a look-alike registry it built itself
    let outsider = VoterCredential::new(VoterSecret::from_bytes([201; 32]), Fr::from(0u64));
    let mut leaves: Vec<Fr> = d.voters[..3]
        .iter()
        .map(|(_, c)| c.commitment(&hasher).commitment)
        .collect();
    leaves.push(outsider.commitment(&hasher).commitment);
    let forged = MerkleTree::build(&hasher, &leaves).unwrap();
    let membership = forged.prove(&leaves[3]).unwrap();
    let prover = d.service.tally().prover();
    let proof = prover
        .generate_quadratic_proof(&outsider, &[3, 0, 0], 9, QUADRATIC, &membership, forged.root())
        .unwrap();
    assert_ne!(proof.public_signals[SIGNAL_QUADRATIC_ROOT], params.kind.root());

    let address = &d.voters[3].0;
    let err = d.service.submit_proof(QUADRATIC, address, &proof).await.unwrap_err();
    assert!(matches!(err, VotingError::InvalidProof(_)));

    // Relabelling the root breaks the proof itself
    let mut relabelled = proof.clone();
    relabelled.public_signals[SIGNAL_QUADRATIC_ROOT] = params.kind.root();
    let err = d.service.submit_proof(QUADRATIC, address, &relabelled).await.unwrap_err();
    assert!(matches!(err, VotingError::InvalidProof(_)));

    let digest = d.service.get_tally(QUADRATIC).unwrap();
    assert_eq!(digest.accepted_count, 0);
    assert_eq!(digest.rejected_count, 2);

    d.service
        .submit_vote(QUADRATIC, d.request(3, Ballot::Quadratic { weights: vec![3, 0, 0] }))
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn nullifiers_differ_across_campaigns() {
    let dir = tempdir().unwrap();
    let d = deploy(&dir.path().join("coinsensus.redb"), Arc::new(ManualClock::new(START)));
    d.service.open_standard_campaign(STANDARD, 3).unwrap();
    d.service.open_standard_campaign(SECOND_STANDARD, 3).unwrap();

    let a = d
        .service
        .submit_vote(STANDARD, d.request(1, Ballot::Standard { option: 0 }))
        .await
        .unwrap();
    d.clock.advance(DAY);
    let b = d
        .service
        .submit_vote(SECOND_STANDARD, d.request(1, Ballot::Standard { option: 0 }))
        .await
        .unwrap();
    assert_ne!(a.nullifier, b.nullifier);
    assert_eq!(d.service.get_tally(SECOND_STANDARD).unwrap().accepted_count, 1);
}
