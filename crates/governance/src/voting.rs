//! Voting rules and the execution verdict
//!
//! Nothing happens when a deadline passes. The verdict is a pure function of
//! the stored tally and the time of the call.

use std::collections::BTreeMap;

use coffer_common::{AccountId, Amount, Error, Result, Timestamp};
use coffer_config::{ExpiryPolicy, PoolSettings, ThresholdRule};
use serde::{Deserialize, Serialize};

/// Vote totals of one proposal at the time of an execution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub yes: Amount,
    pub no: Amount,
    pub yes_voters: u32,
    /// Voting weight in existence when the proposal was created
    pub total_weight: Amount,
}

/// Voting weight of every account at the moment a proposal was created.
///
/// A ballot never carries more than the voter's entry here, so shares that
/// change hands or get delegated after one holder voted cannot vote again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightSnapshot {
    weights: BTreeMap<AccountId, Amount>,
    total: Amount,
}

impl WeightSnapshot {
    pub fn new(weights: impl IntoIterator<Item = (AccountId, Amount)>) -> Self {
        let weights: BTreeMap<AccountId, Amount> = weights
            .into_iter()
            .filter(|(_, weight)| *weight > 0)
            .collect();
        let total = weights.values().fold(0, |acc: Amount, w| acc.saturating_add(*w));
        Self { weights, total }
    }

    pub fn weight_of(&self, account: &AccountId) -> Amount {
        self.weights.get(account).copied().unwrap_or(0)
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    /// Weight a ballot cast now may carry: the current weight, capped by
    /// the weight held at creation
    pub fn ballot_weight(&self, account: &AccountId, current: Amount) -> Amount {
        current.min(self.weight_of(account))
    }
}

/// The subset of pool settings that governs execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingRules {
    /// Percent of total weight (0-100)
    pub threshold: u32,
    pub min_yes_voters: u32,
    pub rule: ThresholdRule,
    pub expiry: ExpiryPolicy,
}

impl From<&PoolSettings> for VotingRules {
    fn from(settings: &PoolSettings) -> Self {
        Self {
            threshold: settings.voting_threshold,
            min_yes_voters: settings.min_yes_voters,
            rule: settings.threshold_rule,
            expiry: settings.expiry,
        }
    }
}

impl VotingRules {
    /// Whether the No side already holds enough weight that the threshold
    /// can never be reached
    fn majority_against(&self, tally: &Tally) -> bool {
        let blocking = 100u32.saturating_sub(self.threshold) as Amount;
        tally.no.saturating_mul(100) > blocking.saturating_mul(tally.total_weight)
    }

    /// Decide whether a proposal with `tally` may execute at `now`.
    ///
    /// Before the deadline: no blocking No weight, enough distinct Yes
    /// voters and the threshold met. After it: Yes must outweigh No (ties
    /// reject) and, with an expiry window, the window must still be open.
    pub fn check(&self, tally: &Tally, deadline: Timestamp, now: Timestamp) -> Result<()> {
        if now < deadline {
            if self.majority_against(tally) {
                return Err(Error::state("Majority voted against execution"));
            }
            if tally.yes_voters < self.min_yes_voters {
                return Err(Error::state("Not enough members voted yes"));
            }
            if !self.rule.is_met(tally.yes, tally.total_weight, self.threshold) {
                return Err(Error::state("Voting still allowed"));
            }
            return Ok(());
        }

        if let ExpiryPolicy::Window { seconds } = self.expiry {
            if now > deadline.saturating_add(seconds) {
                return Err(Error::state("Proposal expired"));
            }
        }
        if tally.yes == 0 && tally.no == 0 {
            return Err(Error::state("Proposal has no support"));
        }
        if tally.no >= tally.yes {
            return Err(Error::state("Majority voted against execution"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(rule: ThresholdRule) -> VotingRules {
        VotingRules {
            threshold: 51,
            min_yes_voters: 1,
            rule,
            expiry: ExpiryPolicy::Unbounded,
        }
    }

    fn tally(yes: Amount, no: Amount, yes_voters: u32, total: Amount) -> Tally {
        Tally {
            yes,
            no,
            yes_voters,
            total_weight: total,
        }
    }

    #[test]
    fn test_threshold_boundary_at_least() {
        let r = rules(ThresholdRule::AtLeast);
        // 51 of 100 is exactly the threshold
        assert!(r.check(&tally(51, 0, 1, 100), 100, 10).is_ok());
        assert_eq!(
            r.check(&tally(50, 0, 1, 100), 100, 10).unwrap_err().reason(),
            "Voting still allowed"
        );
    }

    #[test]
    fn test_threshold_boundary_strictly_greater() {
        let r = rules(ThresholdRule::StrictlyGreater);
        assert!(r.check(&tally(51, 0, 1, 100), 100, 10).is_err());
        assert!(r.check(&tally(52, 0, 1, 100), 100, 10).is_ok());
    }

    #[test]
    fn test_majority_against_before_deadline() {
        let r = rules(ThresholdRule::AtLeast);
        // 49% No leaves 51% reachable
        assert_eq!(
            r.check(&tally(10, 49, 1, 100), 100, 10).unwrap_err().reason(),
            "Voting still allowed"
        );
        assert_eq!(
            r.check(&tally(10, 50, 1, 100), 100, 10).unwrap_err().reason(),
            "Majority voted against execution"
        );
    }

    #[test]
    fn test_min_yes_voters() {
        let mut r = rules(ThresholdRule::AtLeast);
        r.min_yes_voters = 2;
        assert_eq!(
            r.check(&tally(100, 0, 1, 100), 100, 10).unwrap_err().reason(),
            "Not enough members voted yes"
        );
        assert!(r.check(&tally(100, 0, 2, 100), 100, 10).is_ok());
    }

    #[test]
    fn test_after_deadline() {
        let r = rules(ThresholdRule::AtLeast);
        assert!(r.check(&tally(10, 0, 1, 100), 100, 100).is_ok());
        assert!(r.check(&tally(10, 9, 1, 100), 100, 500).is_ok());
        assert_eq!(
            r.check(&tally(10, 10, 1, 100), 100, 100).unwrap_err().reason(),
            "Majority voted against execution"
        );
        assert_eq!(
            r.check(&tally(0, 0, 0, 100), 100, 100).unwrap_err().reason(),
            "Proposal has no support"
        );
    }

    #[test]
    fn test_snapshot_caps_ballot_weight() {
        let alice = AccountId::derive("alice");
        let bob = AccountId::derive("bob");
        let snapshot = WeightSnapshot::new([(alice, 10), (bob, 0)]);
        assert_eq!(snapshot.total(), 10);
        assert_eq!(snapshot.ballot_weight(&alice, 25), 10);
        assert_eq!(snapshot.ballot_weight(&alice, 4), 4);
        // Joined after creation
        assert_eq!(snapshot.ballot_weight(&bob, 10), 0);
    }

    #[test]
    fn test_expiry_window() {
        let mut r = rules(ThresholdRule::AtLeast);
        r.expiry = ExpiryPolicy::Window { seconds: 50 };
        assert!(r.check(&tally(10, 0, 1, 100), 100, 150).is_ok());
        assert_eq!(
            r.check(&tally(10, 0, 1, 100), 100, 151).unwrap_err().reason(),
            "Proposal expired"
        );
    }
}
