//! Discovery index of pools by member and creator

use std::collections::BTreeSet;

use coffer_common::AccountId;
use dashmap::DashMap;
use tracing::debug;

/// Receives committed membership changes from pools
pub trait MembershipObserver: Send + Sync {
    fn pool_launched(&self, pool: &AccountId, creator: &AccountId);

    fn member_added(&self, pool: &AccountId, member: &AccountId);

    fn member_removed(&self, pool: &AccountId, member: &AccountId);
}

#[derive(Debug, Default)]
pub struct PoolDirectory {
    by_member: DashMap<AccountId, BTreeSet<AccountId>>,
    by_creator: DashMap<AccountId, BTreeSet<AccountId>>,
}

impl PoolDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pools_of_member(&self, member: &AccountId) -> Vec<AccountId> {
        self.by_member
            .get(member)
            .map(|pools| pools.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn pools_of_creator(&self, creator: &AccountId) -> Vec<AccountId> {
        self.by_creator
            .get(creator)
            .map(|pools| pools.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl MembershipObserver for PoolDirectory {
    fn pool_launched(&self, pool: &AccountId, creator: &AccountId) {
        self.by_creator.entry(*creator).or_default().insert(*pool);
        debug!("Directory: pool {} launched by {}", pool, creator);
    }

    fn member_added(&self, pool: &AccountId, member: &AccountId) {
        self.by_member.entry(*member).or_default().insert(*pool);
    }

    fn member_removed(&self, pool: &AccountId, member: &AccountId) {
        if let Some(mut pools) = self.by_member.get_mut(member) {
            pools.remove(pool);
        }
    }
}
