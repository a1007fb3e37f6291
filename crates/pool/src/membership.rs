//! Whitelist, members, invite secrets and the closed flag

use std::collections::{BTreeMap, BTreeSet};

use coffer_common::{AccountId, Amount, Error, Result};
use coffer_crypto::Hash;

#[derive(Debug, Clone, Default)]
pub struct MembershipRegistry {
    whitelist: BTreeSet<AccountId>,
    members: BTreeSet<AccountId>,
    /// Invite hash -> remaining uses; exhausted entries stay registered
    secrets: BTreeMap<Hash, u32>,
    /// Base currency each member has put in
    invested: BTreeMap<AccountId, Amount>,
    closed: bool,
}

impl MembershipRegistry {
    pub fn new(whitelist: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            whitelist: whitelist.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn is_member(&self, account: &AccountId) -> bool {
        self.members.contains(account)
    }

    pub fn is_whitelisted(&self, account: &AccountId) -> bool {
        self.whitelist.contains(account)
    }

    pub fn members(&self) -> Vec<AccountId> {
        self.members.iter().copied().collect()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn whitelist(&self) -> Vec<AccountId> {
        self.whitelist.iter().copied().collect()
    }

    pub fn secret_uses(&self, hash: &Hash) -> Option<u32> {
        self.secrets.get(hash).copied()
    }

    pub fn invested(&self, account: &AccountId) -> Amount {
        self.invested.get(account).copied().unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn require_member(&self, account: &AccountId, reason: &str) -> Result<()> {
        if !self.is_member(account) {
            return Err(Error::membership(reason));
        }
        Ok(())
    }

    pub fn add_to_whitelist(&mut self, inviter: &AccountId, invitee: AccountId) -> Result<()> {
        self.require_member(inviter, "Only Members can Invite new Users")?;
        self.whitelist.insert(invitee);
        Ok(())
    }

    pub fn register_secret(&mut self, inviter: &AccountId, hash: Hash, uses: u32) -> Result<()> {
        self.require_member(inviter, "Only Members can Invite new Users")?;
        if uses == 0 {
            return Err(Error::validation("Secret needs at least one use"));
        }
        if self.secrets.contains_key(&hash) {
            return Err(Error::validation("Secret already registered"));
        }
        self.secrets.insert(hash, uses);
        Ok(())
    }

    /// Check a secret has a use left without spending it
    pub fn check_secret(&self, hash: &Hash) -> Result<()> {
        match self.secrets.get(hash) {
            Some(uses) if *uses > 0 => Ok(()),
            Some(_) => Err(Error::membership("Secret has no uses left")),
            None => Err(Error::membership("Not on Whitelist")),
        }
    }

    pub fn spend_secret(&mut self, hash: &Hash) -> Result<u32> {
        self.check_secret(hash)?;
        let uses = self
            .secrets
            .get_mut(hash)
            .ok_or_else(|| Error::membership("Not on Whitelist"))?;
        *uses -= 1;
        Ok(*uses)
    }

    pub fn check_capacity(&self, max_members: u32) -> Result<()> {
        if self.members.len() >= max_members as usize {
            return Err(Error::membership("Member limit reached"));
        }
        Ok(())
    }

    pub fn add_member(&mut self, account: AccountId) {
        self.whitelist.insert(account);
        self.members.insert(account);
    }

    pub fn remove_member(&mut self, account: &AccountId) {
        self.members.remove(account);
        self.invested.remove(account);
    }

    pub fn record_investment(&mut self, account: &AccountId, amount: Amount) {
        *self.invested.entry(*account).or_insert(0) += amount;
    }

    /// Irreversible
    pub fn close(&mut self) -> bool {
        let changed = !self.closed;
        self.closed = true;
        changed
    }

    pub(crate) fn clear_members(&mut self) -> Vec<AccountId> {
        let members = self.members();
        self.members.clear();
        self.invested.clear();
        members
    }
}
