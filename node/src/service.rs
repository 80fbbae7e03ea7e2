//! Vote submission pipeline
//!
//! ```text
//! campaign checks -> ballot checks -> eligibility -> registry proof
//!     -> proof generation (blocking pool) -> verification (blocking pool)
//!     -> commit (eligibility + tally)
//! ```
//!
//! Apart from rejection counts nothing before the commit has side effects, so
//! a caller may drop the future at any point before it resolves.

use std::sync::Arc;

use coinsensus_hash::Fr;
use coinsensus_proof::{
    allocation_cost, ProofBackend, ProofResult, VoteProof, SIGNAL_CHOICE,
};
use coinsensus_registry::{RegistryStore, VoterCredential};
use coinsensus_sybil::{Address, Clock, CommitError, EligibilityDecision, EligibilityEngine};
use coinsensus_tally::{
    Accepted, CampaignKind, CampaignParams, TallyAggregator, TallyDigest, VerifiedVote,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::directory::{AcceptedVoteInfo, CampaignDirectory, CampaignInfo};
use crate::error::{VotingError, VotingResult};
use crate::ServiceConfig;

/// What the voter wants to cast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ballot {
    Standard { option: u32 },
    Quadratic { weights: Vec<u64> },
}

/// Voter-side artifacts for one submission
#[derive(Debug, Clone)]
pub struct VoteRequest {
    /// Ledger address the eligibility rules apply to
    pub address: Address,
    pub credential: VoterCredential,
    pub ballot: Ballot,
}

pub struct VotingService<B: ProofBackend> {
    registries: Arc<dyn RegistryStore>,
    eligibility: Arc<EligibilityEngine>,
    tally: Arc<TallyAggregator<B>>,
    directory: Arc<dyn CampaignDirectory>,
    clock: Arc<dyn Clock>,
    proof_slots: Semaphore,
}

impl<B: ProofBackend + 'static> VotingService<B> {
    pub fn new(
        config: &ServiceConfig,
        registries: Arc<dyn RegistryStore>,
        eligibility: Arc<EligibilityEngine>,
        tally: Arc<TallyAggregator<B>>,
        directory: Arc<dyn CampaignDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registries,
            eligibility,
            tally,
            directory,
            clock,
            proof_slots: Semaphore::new(config.max_concurrent_proofs.max(1)),
        }
    }

    pub fn tally(&self) -> &Arc<TallyAggregator<B>> {
        &self.tally
    }

    pub fn eligibility(&self) -> &Arc<EligibilityEngine> {
        &self.eligibility
    }

    fn backend(&self) -> &Arc<B> {
        self.tally.prover().backend()
    }

    fn frozen_registry(&self, campaign_id: u64) -> VotingResult<(Fr, usize)> {
        let root = self
            .registries
            .root(campaign_id)?
            .ok_or_else(|| VotingError::Storage(format!("registry for campaign {} is not frozen", campaign_id)))?;
        let depth = self.registries.depth(campaign_id)?.unwrap_or(0);
        Ok((root, depth))
    }

    /// Bind a standard campaign to its frozen registry
    pub fn open_standard_campaign(&self, campaign_id: u64, options: u32) -> VotingResult<CampaignParams> {
        let (root, depth) = self.frozen_registry(campaign_id)?;
        self.open_campaign(campaign_id, CampaignKind::Standard { options, root, depth })
    }

    /// Bind a quadratic campaign to its frozen registry and credit budget
    pub fn open_quadratic_campaign(
        &self,
        campaign_id: u64,
        options: u32,
        total_credits: u64,
    ) -> VotingResult<CampaignParams> {
        let (root, depth) = self.frozen_registry(campaign_id)?;
        self.open_campaign(
            campaign_id,
            CampaignKind::Quadratic {
                options,
                total_credits,
                root,
                depth,
            },
        )
    }

    fn open_campaign(&self, campaign_id: u64, kind: CampaignKind) -> VotingResult<CampaignParams> {
        let verification_key = self.backend().verification_key(&kind.circuit())?;
        let params = CampaignParams {
            campaign_id,
            kind,
            verification_key,
        };
        self.tally.open_campaign(params.clone())?;
        Ok(params)
    }

    pub async fn check_eligibility(
        &self,
        address: &Address,
        campaign_id: u64,
    ) -> VotingResult<EligibilityDecision> {
        Ok(self.eligibility.can_vote(address, campaign_id).await?)
    }

    pub fn get_tally(&self, campaign_id: u64) -> VotingResult<TallyDigest> {
        Ok(self.tally.get_tally(campaign_id)?)
    }

    async fn open_campaign_params(&self, campaign_id: u64) -> VotingResult<(CampaignInfo, CampaignParams)> {
        let info = self
            .directory
            .get_campaign(campaign_id)
            .await
            .map_err(|e| VotingError::Storage(e.to_string()))?
            .ok_or(VotingError::UnknownCampaign(campaign_id))?;
        if !info.is_open(self.clock.now()) {
            return Err(VotingError::CampaignClosed(campaign_id));
        }
        let params = self.tally.campaign_params(campaign_id)?;
        Ok((info, params))
    }

    fn check_ballot(info: &CampaignInfo, params: &CampaignParams, ballot: &Ballot) -> VotingResult<()> {
        match (&params.kind, ballot) {
            (CampaignKind::Standard { options, .. }, Ballot::Standard { option }) => {
                if *option >= info.options.min(*options) {
                    return Err(VotingError::InvalidProof("option out of range".into()));
                }
            }
            (
                CampaignKind::Quadratic {
                    options, total_credits, ..
                },
                Ballot::Quadratic { weights },
            ) => {
                if weights.len() != *options as usize {
                    return Err(VotingError::InvalidAllocation(format!(
                        "expected {} weights, got {}",
                        options,
                        weights.len()
                    )));
                }
                allocation_cost(weights, *total_credits)?;
            }
            _ => return Err(VotingError::InvalidProof("ballot does not match campaign kind".into())),
        }
        Ok(())
    }

    async fn require_eligible(&self, address: &Address, campaign_id: u64) -> VotingResult<()> {
        let decision = self.eligibility.can_vote(address, campaign_id).await?;
        if !decision.allowed {
            return Err(VotingError::EligibilityDenied(decision.reason_strings()));
        }
        Ok(())
    }

    async fn generate(
        &self,
        campaign_id: u64,
        params: &CampaignParams,
        request: &VoteRequest,
    ) -> VotingResult<VoteProof> {
        let prover = self.tally.prover().clone();
        let commitment = request.credential.commitment(prover.backend().hasher()).commitment;
        let membership = self.registries.prove(campaign_id, &commitment)?;

        let _permit = self
            .proof_slots
            .acquire()
            .await
            .map_err(|_| VotingError::ProofGenerationFailed("proof workers shut down".into()))?;

        let credential = request.credential.clone();
        let task: tokio::task::JoinHandle<ProofResult<VoteProof>> = match (&params.kind, &request.ballot) {
            (CampaignKind::Standard { options, root, .. }, Ballot::Standard { option }) => {
                let (options, root, option) = (*options, *root, *option);
                tokio::task::spawn_blocking(move || {
                    prover.generate_vote_proof(&credential, option, campaign_id, options, &membership, root)
                })
            }
            (
                CampaignKind::Quadratic {
                    total_credits, root, ..
                },
                Ballot::Quadratic { weights },
            ) => {
                let (weights, total_credits, root) = (weights.clone(), *total_credits, *root);
                tokio::task::spawn_blocking(move || {
                    prover.generate_quadratic_proof(
                        &credential,
                        &weights,
                        total_credits,
                        campaign_id,
                        &membership,
                        root,
                    )
                })
            }
            _ => return Err(VotingError::InvalidProof("ballot does not match campaign kind".into())),
        };

        let proof = task
            .await
            .map_err(|e| VotingError::ProofGenerationFailed(e.to_string()))??;
        debug!(campaign_id, "Proof ready for commit");
        Ok(proof)
    }

    async fn verify(&self, campaign_id: u64, proof: &VoteProof) -> VotingResult<VerifiedVote> {
        let tally = Arc::clone(&self.tally);
        let proof = proof.clone();
        let verified = tokio::task::spawn_blocking(move || tally.verify_vote(campaign_id, &proof))
            .await
            .map_err(|e| VotingError::InvalidProof(format!("verification task failed: {}", e)))??;
        Ok(verified)
    }

    async fn commit(&self, campaign_id: u64, address: &Address, proof: &VoteProof) -> VotingResult<Accepted> {
        let verified = self.verify(campaign_id, proof).await?;
        let tally = Arc::clone(&self.tally);
        let accepted = self
            .eligibility
            .commit_vote(address, || tally.accept_verified(&verified))
            .await
            .map_err(|e| match e {
                CommitError::Denied(reasons) => {
                    VotingError::EligibilityDenied(reasons.iter().map(ToString::to_string).collect())
                }
                CommitError::Rejected(e) => e.into(),
                CommitError::Store(e) => e.into(),
            })?;

        let info = AcceptedVoteInfo {
            choice: proof
                .public_signals
                .get(SIGNAL_CHOICE)
                .copied()
                .unwrap_or(Fr::from(0u64)),
            nullifier: accepted.nullifier.as_field(),
            accepted_count: accepted.accepted_count,
        };
        if let Err(e) = self.directory.record_accepted_vote(campaign_id, &info).await {
            warn!(campaign_id, error = %e, "Campaign directory did not record accepted vote");
        }
        info!(campaign_id, "Vote submission accepted");
        Ok(accepted)
    }

    /// Generate and submit a vote on the voter's behalf
    pub async fn submit_vote(&self, campaign_id: u64, request: VoteRequest) -> VotingResult<Accepted> {
        let (info, params) = self.open_campaign_params(campaign_id).await?;
        Self::check_ballot(&info, &params, &request.ballot)?;
        self.require_eligible(&request.address, campaign_id).await?;

        let proof = self.generate(campaign_id, &params, &request).await?;
        self.commit(campaign_id, &request.address, &proof).await
    }

    /// Submit a proof generated elsewhere
    pub async fn submit_proof(
        &self,
        campaign_id: u64,
        address: &Address,
        proof: &VoteProof,
    ) -> VotingResult<Accepted> {
        self.open_campaign_params(campaign_id).await?;
        self.require_eligible(address, campaign_id).await?;
        self.commit(campaign_id, address, proof).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryCampaignDirectory;
    use coinsensus_hash::Blake3Field;
    use coinsensus_proof::testing::TranscriptBackend;
    use coinsensus_registry::{MemoryRegistryStore, MerkleTree, VoterSecret};
    use coinsensus_sybil::{
        EligibilityConfig, EligibilityStore, LedgerProfile, ManualClock, MemoryEligibilityStore,
        StaticLedger,
    };
    use coinsensus_tally::{MemoryTallyStore, TallyConfig};

    type Backend = TranscriptBackend<Blake3Field>;

    const START: u64 = 1_700_000_000;
    const DAY: u64 = 86_400;
    const STANDARD: u64 = 1;
    const QUADRATIC: u64 = 2;

    struct Fixture {
        service: VotingService<Backend>,
        backend: Arc<Backend>,
        ledger: Arc<StaticLedger>,
        records: Arc<MemoryEligibilityStore>,
        directory: Arc<MemoryCampaignDirectory>,
        clock: Arc<ManualClock>,
        voters: Vec<(Address, VoterCredential)>,
    }

    fn fixture() -> Fixture {
        let h = Blake3Field;
        let backend = Arc::new(TranscriptBackend::new(h));
        let ledger = Arc::new(StaticLedger::new());
        let records = Arc::new(MemoryEligibilityStore::new());
        let clock = Arc::new(ManualClock::new(START));
        let directory = Arc::new(MemoryCampaignDirectory::new());
        let registries = Arc::new(MemoryRegistryStore::new(h));

        let voters: Vec<_> = (0..4u8)
            .map(|i| {
                let address = Address::new(format!("addr{}", i));
                let credential =
                    VoterCredential::new(VoterSecret::from_bytes([i + 1; 32]), Fr::from(i as u64));
                ledger.set(
                    address.clone(),
                    LedgerProfile {
                        account_age_days: 90,
                        balance: 10,
                        transaction_count: 20,
                    },
                );
                (address, credential)
            })
            .collect();

        for campaign_id in [STANDARD, QUADRATIC] {
            registries.open(campaign_id);
            for (_, credential) in &voters {
                registries
                    .register(campaign_id, credential.commitment(&h).commitment)
                    .unwrap();
            }
            registries.freeze(campaign_id).unwrap();
            directory.upsert(
                campaign_id,
                CampaignInfo {
                    options: 3,
                    end_time: START + 30 * DAY,
                    is_active: true,
                },
            );
        }

        let eligibility = Arc::new(EligibilityEngine::new(
            EligibilityConfig::default(),
            ledger.clone(),
            records.clone(),
            clock.clone(),
        ));
        let tally = Arc::new(
            TallyAggregator::new(backend.clone(), Arc::new(MemoryTallyStore::new()), &TallyConfig::default())
                .unwrap(),
        );
        let service = VotingService::new(
            &ServiceConfig::default(),
            registries,
            eligibility,
            tally,
            directory.clone(),
            clock.clone(),
        );
        service.open_standard_campaign(STANDARD, 3).unwrap();
        service.open_quadratic_campaign(QUADRATIC, 3, 9).unwrap();

        Fixture {
            service,
            backend,
            ledger,
            records,
            directory,
            clock,
            voters,
        }
    }

    impl Fixture {
        fn request(&self, voter: usize, ballot: Ballot) -> VoteRequest {
            let (address, credential) = &self.voters[voter];
            VoteRequest {
                address: address.clone(),
                credential: credential.clone(),
                ballot,
            }
        }

        fn untouched(&self, voter: usize) -> bool {
            self.records
                .load(&self.voters[voter].0)
                .unwrap()
                .map_or(true, |r| r.last_vote_time.is_none())
        }
    }

    #[tokio::test]
    async fn test_standard_vote_accepted() {
        let f = fixture();
        let accepted = f
            .service
            .submit_vote(STANDARD, f.request(0, Ballot::Standard { option: 2 }))
            .await
            .unwrap();
        assert_eq!(accepted.accepted_count, 1);

        let digest = f.service.get_tally(STANDARD).unwrap();
        assert_eq!(digest.option_counts, vec![0, 0, 1]);
        assert_eq!(f.directory.recorded().len(), 1);
        assert!(!f.untouched(0));
    }

    #[tokio::test]
    async fn test_second_vote_hits_cooldown_then_nullifier() {
        let f = fixture();
        f.service
            .submit_vote(STANDARD, f.request(1, Ballot::Standard { option: 0 }))
            .await
            .unwrap();

        let err = f
            .service
            .submit_vote(STANDARD, f.request(1, Ballot::Standard { option: 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, VotingError::EligibilityDenied(ref r) if r[0].starts_with("cooldown active")));

        f.clock.advance(DAY);
        let err = f
            .service
            .submit_vote(STANDARD, f.request(1, Ballot::Standard { option: 1 }))
            .await
            .unwrap_err();
        assert_eq!(err, VotingError::DuplicateVote);
        assert_eq!(err.to_string(), "already voted");
        assert_eq!(f.service.get_tally(STANDARD).unwrap().option_counts, vec![1, 0, 0]);
    }

    #[tokio::test]
    async fn test_ineligible_voter_skips_proving() {
        let f = fixture();
        f.ledger.set(
            f.voters[2].0.clone(),
            LedgerProfile {
                account_age_days: 10,
                balance: 5,
                transaction_count: 0,
            },
        );

        let err = f
            .service
            .submit_vote(STANDARD, f.request(2, Ballot::Standard { option: 0 }))
            .await
            .unwrap_err();
        assert_eq!(err, VotingError::EligibilityDenied(vec!["account too new".into()]));
        assert_eq!(f.backend.prove_calls(), 0);
    }

    #[tokio::test]
    async fn test_unregistered_voter() {
        let f = fixture();
        let request = VoteRequest {
            address: f.voters[0].0.clone(),
            credential: VoterCredential::new(VoterSecret::from_bytes([77; 32]), Fr::from(77u64)),
            ballot: Ballot::Standard { option: 0 },
        };
        let err = f.service.submit_vote(STANDARD, request).await.unwrap_err();
        assert_eq!(err, VotingError::NotRegistered);
        assert_eq!(f.backend.prove_calls(), 0);
        assert!(f.untouched(0));
    }

    #[tokio::test]
    async fn test_campaign_checks() {
        let f = fixture();
        let err = f
            .service
            .submit_vote(99, f.request(0, Ballot::Standard { option: 0 }))
            .await
            .unwrap_err();
        assert_eq!(err, VotingError::UnknownCampaign(99));

        let err = f
            .service
            .submit_vote(STANDARD, f.request(0, Ballot::Standard { option: 3 }))
            .await
            .unwrap_err();
        assert!(matches!(err, VotingError::InvalidProof(_)));

        f.directory.close(STANDARD);
        let err = f
            .service
            .submit_vote(STANDARD, f.request(0, Ballot::Standard { option: 0 }))
            .await
            .unwrap_err();
        assert_eq!(err, VotingError::CampaignClosed(STANDARD));

        f.clock.set(START + 31 * DAY);
        let err = f
            .service
            .submit_vote(QUADRATIC, f.request(0, Ballot::Quadratic { weights: vec![1, 0, 0] }))
            .await
            .unwrap_err();
        assert_eq!(err, VotingError::CampaignClosed(QUADRATIC));
        assert_eq!(f.backend.prove_calls(), 0);
    }

    #[tokio::test]
    async fn test_quadratic_allocations() {
        let f = fixture();
        f.service
            .submit_vote(QUADRATIC, f.request(0, Ballot::Quadratic { weights: vec![2, 2, 0] }))
            .await
            .unwrap();

        let err = f
            .service
            .submit_vote(QUADRATIC, f.request(1, Ballot::Quadratic { weights: vec![3, 1, 0] }))
            .await
            .unwrap_err();
        assert!(matches!(err, VotingError::InvalidAllocation(_)));
        assert!(!err.is_retryable());
        assert_eq!(f.backend.prove_calls(), 1);
        assert!(f.untouched(1));

        let digest = f.service.get_tally(QUADRATIC).unwrap();
        assert_eq!(digest.accepted_count, 1);
        assert_eq!(digest.credits_allotted, 9);
    }

    #[tokio::test]
    async fn test_quadratic_requires_registered_voter() {
        let f = fixture();
        let h = Blake3Field;
        let outsider = VoterCredential::new(VoterSecret::from_bytes([201; 32]), Fr::from(0u64));
        let request = VoteRequest {
            address: f.voters[2].0.clone(),
            credential: outsider.clone(),
            ballot: Ballot::Quadratic { weights: vec![3, 0, 0] },
        };
        assert_eq!(
            f.service.submit_vote(QUADRATIC, request).await.unwrap_err(),
            VotingError::NotRegistered
        );

        // A registry of the outsider's own making, same depth
        let mut commitments: Vec<_> = f.voters[..3]
            .iter()
            .map(|(_, c)| c.commitment(&h).commitment)
            .collect();
        commitments.push(outsider.commitment(&h).commitment);
        let forged = MerkleTree::build(&h, &commitments).unwrap();
        let membership = forged.prove(&outsider.commitment(&h).commitment).unwrap();
        let proof = f
            .service
            .tally()
            .prover()
            .generate_quadratic_proof(&outsider, &[3, 0, 0], 9, QUADRATIC, &membership, forged.root())
            .unwrap();

        let err = f
            .service
            .submit_proof(QUADRATIC, &f.voters[2].0, &proof)
            .await
            .unwrap_err();
        assert!(matches!(err, VotingError::InvalidProof(_)));
        assert!(f.untouched(2));
        let digest = f.service.get_tally(QUADRATIC).unwrap();
        assert_eq!(digest.accepted_count, 0);
        assert_eq!(digest.rejected_count, 1);
    }

    #[tokio::test]
    async fn test_generation_failure_is_retryable() {
        let f = fixture();
        f.backend.fail_next_prove();
        let err = f
            .service
            .submit_vote(STANDARD, f.request(3, Ballot::Standard { option: 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, VotingError::ProofGenerationFailed(_)));
        assert!(err.is_retryable());
        assert!(f.untouched(3));

        f.service
            .submit_vote(STANDARD, f.request(3, Ballot::Standard { option: 1 }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_tampered_external_proof() {
        let f = fixture();
        let (address, credential) = &f.voters[0];
        let membership = f
            .service
            .registries
            .prove(STANDARD, &credential.commitment(&Blake3Field).commitment)
            .unwrap();
        let root = f.service.registries.root(STANDARD).unwrap().unwrap();
        let mut proof = f
            .service
            .tally()
            .prover()
            .generate_vote_proof(credential, 0, STANDARD, 3, &membership, root)
            .unwrap();
        proof.public_signals[SIGNAL_CHOICE] = Fr::from(1u64);

        let err = f.service.submit_proof(STANDARD, address, &proof).await.unwrap_err();
        assert!(matches!(err, VotingError::InvalidProof(_)));
        assert!(f.untouched(0));
        assert_eq!(f.service.get_tally(STANDARD).unwrap().rejected_count, 1);
    }

    #[tokio::test]
    async fn test_check_eligibility() {
        let f = fixture();
        let decision = f.service.check_eligibility(&f.voters[0].0, STANDARD).await.unwrap();
        assert!(decision.allowed);

        let stranger = Address::from("unknown");
        let decision = f.service.check_eligibility(&stranger, STANDARD).await.unwrap();
        assert_eq!(decision.reason_strings(), vec!["eligibility data unavailable"]);
    }
}
