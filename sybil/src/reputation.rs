//! Advisory reputation score
//!
//! Feeds UI hints and voting-power weighting. The eligibility gate never
//! reads it.

use serde::{Deserialize, Serialize};

use crate::ledger::LedgerProfile;

/// Points per factor and the input at which each factor saturates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationWeights {
    pub age_points: f64,
    pub age_full_days: f64,
    pub balance_points: f64,
    pub balance_full: f64,
    pub transaction_points: f64,
    pub transaction_full: f64,
}

impl Default for ReputationWeights {
    fn default() -> Self {
        // 0.5 pt/day, 10 pt/unit, 0.1 pt/tx
        Self {
            age_points: 40.0,
            age_full_days: 80.0,
            balance_points: 30.0,
            balance_full: 3.0,
            transaction_points: 30.0,
            transaction_full: 300.0,
        }
    }
}

fn scaled(value: u64, full: f64, points: f64) -> f64 {
    if full <= 0.0 {
        return points;
    }
    (value as f64 / full).min(1.0) * points
}

/// Weighted, capped sum clamped to [0, 100]
pub fn reputation_score(profile: &LedgerProfile, weights: &ReputationWeights) -> f64 {
    let score = scaled(profile.account_age_days, weights.age_full_days, weights.age_points)
        + scaled(profile.balance, weights.balance_full, weights.balance_points)
        + scaled(
            profile.transaction_count,
            weights.transaction_full,
            weights.transaction_points,
        );
    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(age: u64, balance: u64, txs: u64) -> LedgerProfile {
        LedgerProfile {
            account_age_days: age,
            balance,
            transaction_count: txs,
        }
    }

    #[test]
    fn test_linear_components() {
        let w = ReputationWeights::default();
        assert_eq!(reputation_score(&profile(0, 0, 0), &w), 0.0);
        assert!((reputation_score(&profile(20, 0, 0), &w) - 10.0).abs() < 1e-9);
        assert!((reputation_score(&profile(0, 1, 0), &w) - 10.0).abs() < 1e-9);
        assert!((reputation_score(&profile(0, 0, 50), &w) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_components_cap() {
        let w = ReputationWeights::default();
        assert!((reputation_score(&profile(10_000, 0, 0), &w) - 40.0).abs() < 1e-9);
        assert!((reputation_score(&profile(0, 10_000, 0), &w) - 30.0).abs() < 1e-9);
        assert_eq!(reputation_score(&profile(10_000, 10_000, 10_000), &w), 100.0);
    }

    #[test]
    fn test_clamped_with_oversized_weights() {
        let w = ReputationWeights {
            age_points: 90.0,
            balance_points: 90.0,
            ..Default::default()
        };
        assert_eq!(reputation_score(&profile(1_000, 1_000, 1_000), &w), 100.0);
    }
}
