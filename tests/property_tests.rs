//! Property-Based Tests for Coinsensus
//!
//! Uses proptest to generate random inputs and verify protocol properties hold.

use std::sync::Arc;

use coinsensus::prelude::*;
use coinsensus::proof::allocation_cost;
use coinsensus::proof::testing::TranscriptBackend;
use coinsensus::sybil::{ManualClock, MemoryEligibilityStore, StaticLedger};
use coinsensus::tally::MemoryTallyStore;
use proptest::prelude::*;

type Backend = TranscriptBackend<Blake3Field>;

const CAMPAIGN: u64 = 9;

// =============================================================================
// STRATEGIES
// =============================================================================

/// Distinct commitments as small field values
fn commitments(max: usize) -> impl Strategy<Value = Vec<Fr>> {
    prop::collection::btree_set(1u64..1_000_000, 1..max)
        .prop_map(|set| set.into_iter().map(Fr::from).collect())
        .prop_shuffle()
}

fn credentials(n: usize) -> Vec<VoterCredential> {
    (0..n)
        .map(|i| {
            let mut bytes = [0u8; 32];
            bytes[..8].copy_from_slice(&(i as u64 + 1).to_le_bytes());
            VoterCredential::new(VoterSecret::from_bytes(bytes), Fr::from(i as u64))
        })
        .collect()
}

/// Transcript proofs for `ballots` of (voter, option)
fn standard_proofs(ballots: &[(usize, u32)], voters: usize) -> (Arc<Backend>, CampaignParams, Vec<VoteProof>) {
    let h = Blake3Field;
    let creds = credentials(voters);
    let leaves: Vec<Fr> = creds.iter().map(|c| c.commitment(&h).commitment).collect();
    let tree = MerkleTree::build(&h, &leaves).unwrap();

    let backend = Arc::new(TranscriptBackend::new(h));
    let kind = CampaignKind::Standard {
        options: 3,
        root: tree.root(),
        depth: tree.depth(),
    };
    let params = CampaignParams {
        campaign_id: CAMPAIGN,
        verification_key: backend.verification_key(&kind.circuit()).unwrap(),
        kind,
    };
    let prover = VoteProver::new(backend.clone());
    let proofs = ballots
        .iter()
        .map(|&(voter, option)| {
            let credential = &creds[voter];
            let membership = tree.prove(&leaves[voter]).unwrap();
            prover
                .generate_vote_proof(credential, option, CAMPAIGN, 3, &membership, tree.root())
                .unwrap()
        })
        .collect();
    (backend, params, proofs)
}

fn ballots() -> impl Strategy<Value = Vec<(usize, u32)>> {
    prop::collection::vec((0usize..6, 0u32..3), 1..24)
}

// =============================================================================
// MERKLE REGISTRY
// =============================================================================

proptest! {
    /// Property: every registered commitment proves against the root
    #[test]
    fn merkle_members_verify(leaves in commitments(40)) {
        let h = Blake3Field;
        let tree = MerkleTree::build(&h, &leaves).unwrap();
        for leaf in &leaves {
            let proof = tree.prove(leaf).unwrap();
            prop_assert_eq!(proof.len(), tree.depth());
            prop_assert!(verify_membership(&h, leaf, &proof, &tree.root()));
        }
    }

    /// Property: a proof does not transfer to another commitment or root
    #[test]
    fn merkle_rejects_outsiders(leaves in commitments(20), outsider in 2_000_000u64..3_000_000) {
        let h = Blake3Field;
        let tree = MerkleTree::build(&h, &leaves).unwrap();
        let proof = tree.prove(&leaves[0]).unwrap();
        prop_assert!(!verify_membership(&h, &Fr::from(outsider), &proof, &tree.root()));
        prop_assert!(!verify_membership(&h, &leaves[0], &proof, &Fr::from(outsider)));
        prop_assert!(tree.prove(&Fr::from(outsider)).is_err());
    }

    /// Property: proving from the raw commitment list agrees with the built tree
    #[test]
    fn merkle_free_prover_matches_tree(leaves in commitments(30)) {
        let h = Blake3Field;
        let a = MerkleTree::build(&h, &leaves).unwrap();
        let b = prove_membership(&h, &leaves[leaves.len() - 1], &leaves).unwrap();
        prop_assert!(verify_membership(&h, &leaves[leaves.len() - 1], &b, &a.root()));
    }
}

// =============================================================================
// QUADRATIC ALLOCATION
// =============================================================================

proptest! {
    /// Property: an allocation is accepted exactly when its squared cost fits the budget
    #[test]
    fn quadratic_budget_rule(
        weights in prop::collection::vec(0u64..12, 1..6),
        total in 0u64..400,
    ) {
        let cost: u64 = weights.iter().map(|w| w * w).sum();
        let result = allocation_cost(&weights, total);
        if cost <= total {
            prop_assert_eq!(result.unwrap(), cost);
        } else {
            prop_assert!(result.is_err());
        }
    }

    /// Property: accepted allocations also produce proofs; rejected ones never reach the backend
    #[test]
    fn quadratic_prover_matches_rule(
        weights in prop::collection::vec(0u64..6, 3..=3),
        total in 0u64..60,
    ) {
        let h = Blake3Field;
        let creds = credentials(2);
        let leaves: Vec<Fr> = creds.iter().map(|c| c.commitment(&h).commitment).collect();
        let tree = MerkleTree::build(&h, &leaves).unwrap();
        let membership = tree.prove(&leaves[1]).unwrap();

        let backend = Arc::new(TranscriptBackend::new(h));
        let prover = VoteProver::new(backend.clone());
        let result =
            prover.generate_quadratic_proof(&creds[1], &weights, total, CAMPAIGN, &membership, tree.root());
        let fits = weights.iter().map(|w| w * w).sum::<u64>() <= total;
        prop_assert_eq!(result.is_ok(), fits);
        prop_assert_eq!(backend.prove_calls(), usize::from(fits));
    }
}

// =============================================================================
// DOUBLE VOTES AND TALLY
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: each voter counts once however submissions interleave
    #[test]
    fn double_votes_rejected_in_any_order(ballots in ballots(), seed in any::<u64>()) {
        let (backend, params, proofs) = standard_proofs(&ballots, 6);
        let mut order: Vec<usize> = (0..proofs.len()).collect();
        // Deterministic permutation from the seed
        order.sort_by_key(|i| (*i as u64).wrapping_mul(seed | 1).rotate_left(17));

        let aggregator = TallyAggregator::new(
            backend,
            Arc::new(MemoryTallyStore::new()),
            &TallyConfig::default(),
        ).unwrap();
        aggregator.open_campaign(params).unwrap();

        let mut accepted = 0u64;
        for i in order {
            match aggregator.accept_vote(CAMPAIGN, &proofs[i]) {
                Ok(_) => accepted += 1,
                Err(e) => prop_assert_eq!(e, coinsensus::tally::TallyError::DuplicateVote),
            }
        }

        let distinct: std::collections::BTreeSet<usize> = ballots.iter().map(|(v, _)| *v).collect();
        prop_assert_eq!(accepted, distinct.len() as u64);
        let digest = aggregator.get_tally(CAMPAIGN).unwrap();
        prop_assert_eq!(digest.accepted_count, distinct.len() as u64);
        prop_assert_eq!(digest.rejected_count, ballots.len() as u64 - accepted);
    }

    /// Property: the digest of a fixed accepted set ignores input order
    #[test]
    fn tally_is_order_independent(voters in prop::collection::btree_set(0usize..6, 1..6), options in prop::collection::vec(0u32..3, 6)) {
        let ballots: Vec<(usize, u32)> = voters.iter().map(|v| (*v, options[*v])).collect();
        let (_, params, proofs) = standard_proofs(&ballots, 6);

        let mut reversed = proofs.clone();
        reversed.reverse();
        let mut rotated = proofs.clone();
        rotated.rotate_left(proofs.len() / 2);

        let h = Blake3Field;
        let expected = compute_tally(&h, CAMPAIGN, &params.kind, &proofs);
        prop_assert_eq!(&expected, &compute_tally(&h, CAMPAIGN, &params.kind, &reversed));
        prop_assert_eq!(&expected, &compute_tally(&h, CAMPAIGN, &params.kind, &rotated));
        prop_assert_eq!(expected.option_counts.iter().sum::<u64>(), voters.len() as u64);
    }
}

// =============================================================================
// ELIGIBILITY
// =============================================================================

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn decide(profile: LedgerProfile) -> EligibilityDecision {
    let address = Address::new("0xprop");
    let ledger = Arc::new(StaticLedger::new());
    ledger.set(address.clone(), profile);
    let engine = EligibilityEngine::new(
        EligibilityConfig::default(),
        ledger,
        Arc::new(MemoryEligibilityStore::new()),
        Arc::new(ManualClock::new(1_700_000_000)),
    );
    runtime().block_on(engine.can_vote(&address, CAMPAIGN)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: more age or balance never turns an allowed address away
    #[test]
    fn eligibility_is_monotone(
        age in 0u64..120,
        balance in 0u64..5,
        extra_age in 0u64..100,
        extra_balance in 0u64..5,
    ) {
        let base = decide(LedgerProfile { account_age_days: age, balance, transaction_count: 0 });
        let richer = decide(LedgerProfile {
            account_age_days: age + extra_age,
            balance: balance + extra_balance,
            transaction_count: 0,
        });
        if base.allowed {
            prop_assert!(richer.allowed);
        }
        prop_assert!(richer.reasons.len() <= base.reasons.len());
        prop_assert_eq!(base.allowed, age >= 30 && balance >= 1);
    }

    /// Property: an address held back only by the cooldown is let through once it elapses
    #[test]
    fn cooldown_denial_lifts_with_time(elapsed in 0u64..200_000) {
        let start = 1_700_000_000;
        let address = Address::new("0xcooldown");
        let ledger = Arc::new(StaticLedger::new());
        ledger.set(address.clone(), LedgerProfile { account_age_days: 60, balance: 3, transaction_count: 1 });
        let clock = Arc::new(ManualClock::new(start));
        let config = EligibilityConfig::default();
        let cooldown = config.cooldown_secs;
        let engine = EligibilityEngine::new(config, ledger, Arc::new(MemoryEligibilityStore::new()), clock.clone());

        let rt = runtime();
        rt.block_on(engine.record_vote(&address)).unwrap();
        clock.set(start + elapsed);
        let decision = rt.block_on(engine.can_vote(&address, CAMPAIGN)).unwrap();
        prop_assert_eq!(decision.allowed, elapsed >= cooldown);
        if !decision.allowed {
            prop_assert_eq!(decision.reasons.len(), 1);
            prop_assert!(decision.reason_strings()[0].starts_with("cooldown active"));
        }
    }
}
