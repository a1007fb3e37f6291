use std::collections::{BTreeMap, BTreeSet};

use coffer_common::{AccountId, Amount};
use tracing::{debug, info};

use crate::math::mul_div;
use crate::{LedgerError, LedgerResult};

/// Balances and delegated voting weight of one pool's shares
#[derive(Debug, Clone)]
pub struct ShareLedger {
    /// Token name
    name: String,
    /// Token symbol
    symbol: String,
    /// The pool allowed to issue, burn and destroy
    owner: AccountId,
    /// Base currency units per share before the first issuance
    seed_price: Amount,
    balances: BTreeMap<AccountId, Amount>,
    total_supply: Amount,
    /// Delegator -> delegate
    delegates: BTreeMap<AccountId, AccountId>,
    /// Delegate -> sum of delegators' balances
    delegated_in: BTreeMap<AccountId, Amount>,
    destroyed: bool,
}

impl ShareLedger {
    pub fn new(name: &str, symbol: &str, owner: AccountId, seed_price: Amount) -> LedgerResult<Self> {
        if seed_price == 0 {
            return Err(LedgerError::InvalidOperation("Seed price must be positive".into()));
        }
        Ok(Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            owner,
            seed_price,
            balances: BTreeMap::new(),
            total_supply: 0,
            delegates: BTreeMap::new(),
            delegated_in: BTreeMap::new(),
            destroyed: false,
        })
    }

    fn ensure_live(&self) -> LedgerResult<()> {
        if self.destroyed {
            return Err(LedgerError::Destroyed);
        }
        Ok(())
    }

    fn only_owner(&self, caller: &AccountId) -> LedgerResult<()> {
        self.ensure_live()?;
        if *caller != self.owner {
            return Err(LedgerError::PermissionDenied("Only Pool".into()));
        }
        Ok(())
    }

    pub fn name(&self) -> LedgerResult<&str> {
        self.ensure_live()?;
        Ok(&self.name)
    }

    pub fn symbol(&self) -> LedgerResult<&str> {
        self.ensure_live()?;
        Ok(&self.symbol)
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn balance_of(&self, account: &AccountId) -> LedgerResult<Amount> {
        self.ensure_live()?;
        Ok(self.raw_balance(account))
    }

    fn raw_balance(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> LedgerResult<Amount> {
        self.ensure_live()?;
        Ok(self.total_supply)
    }

    /// Accounts with a nonzero balance, in account order
    pub fn holders(&self) -> LedgerResult<Vec<(AccountId, Amount)>> {
        self.ensure_live()?;
        Ok(self
            .balances
            .iter()
            .filter(|(_, balance)| **balance > 0)
            .map(|(account, balance)| (*account, *balance))
            .collect())
    }

    pub fn delegate_of(&self, account: &AccountId) -> LedgerResult<Option<AccountId>> {
        self.ensure_live()?;
        Ok(self.delegates.get(account).copied())
    }

    /// Voting weight: own balance unless delegated away, plus everything
    /// delegated in.
    pub fn effective_weight(&self, account: &AccountId) -> LedgerResult<Amount> {
        self.ensure_live()?;
        let own = if self.delegates.contains_key(account) {
            0
        } else {
            self.raw_balance(account)
        };
        let delegated = self.delegated_in.get(account).copied().unwrap_or(0);
        Ok(own + delegated)
    }

    /// Every account with nonzero voting weight. The weights sum to the
    /// total supply.
    pub fn voting_weights(&self) -> LedgerResult<Vec<(AccountId, Amount)>> {
        self.ensure_live()?;
        let accounts: BTreeSet<&AccountId> = self.balances.keys().chain(self.delegated_in.keys()).collect();
        let mut weights = Vec::with_capacity(accounts.len());
        for account in accounts {
            let weight = self.effective_weight(account)?;
            if weight > 0 {
                weights.push((*account, weight));
            }
        }
        Ok(weights)
    }

    /// Base currency per share, rounded down; the seed price before any
    /// shares exist.
    pub fn price(&self, currency_held: Amount) -> LedgerResult<Amount> {
        self.ensure_live()?;
        if self.total_supply == 0 {
            return Ok(self.seed_price);
        }
        Ok(currency_held / self.total_supply)
    }

    /// Shares issued for a stake.
    ///
    /// The first issuance prices the gross stake at the seed price. Later
    /// issuances price the net stake against the currency already held, so
    /// existing holders are never diluted.
    pub fn quote_issue(&self, gross: Amount, net: Amount, currency_held: Amount) -> LedgerResult<Amount> {
        self.ensure_live()?;
        if self.total_supply == 0 || currency_held == 0 {
            return Ok(gross / self.seed_price);
        }
        mul_div(net, self.total_supply, currency_held)
    }

    fn adjust_delegated(&mut self, holder: &AccountId, amount: Amount, add: bool) {
        if let Some(delegate) = self.delegates.get(holder).copied() {
            let entry = self.delegated_in.entry(delegate).or_insert(0);
            if add {
                *entry += amount;
            } else {
                *entry = entry.saturating_sub(amount);
            }
        }
    }

    pub fn issue(&mut self, caller: &AccountId, to: &AccountId, amount: Amount) -> LedgerResult<()> {
        self.only_owner(caller)?;
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow("Total supply".into()))?;
        self.total_supply = supply;
        *self.balances.entry(*to).or_insert(0) += amount;
        self.adjust_delegated(to, amount, true);
        debug!("Issued {} {} to {}", amount, self.symbol, to);
        Ok(())
    }

    pub fn burn(&mut self, caller: &AccountId, from: &AccountId, amount: Amount) -> LedgerResult<()> {
        self.only_owner(caller)?;
        let balance = self.raw_balance(from);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance(format!(
                "{} holds {}, cannot burn {}",
                from, balance, amount
            )));
        }
        self.set_balance(from, balance - amount);
        self.total_supply -= amount;
        self.adjust_delegated(from, amount, false);
        debug!("Burned {} {} from {}", amount, self.symbol, from);
        Ok(())
    }

    fn set_balance(&mut self, account: &AccountId, balance: Amount) {
        if balance == 0 {
            self.balances.remove(account);
        } else {
            self.balances.insert(*account, balance);
        }
    }

    pub fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> LedgerResult<()> {
        self.ensure_live()?;
        let balance = self.raw_balance(from);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance(format!(
                "{} holds {}, cannot transfer {}",
                from, balance, amount
            )));
        }
        if from == to {
            return Ok(());
        }
        self.set_balance(from, balance - amount);
        *self.balances.entry(*to).or_insert(0) += amount;
        self.adjust_delegated(from, amount, false);
        self.adjust_delegated(to, amount, true);
        Ok(())
    }

    /// Hand `holder`'s voting weight to `delegate`, replacing any earlier
    /// delegation.
    pub fn delegate_votes(&mut self, holder: &AccountId, delegate: &AccountId) -> LedgerResult<()> {
        self.ensure_live()?;
        if holder == delegate {
            return Err(LedgerError::InvalidOperation("Cannot delegate to self".into()));
        }
        if self.delegates.contains_key(holder) {
            self.revoke_delegation(holder)?;
        }
        let balance = self.raw_balance(holder);
        self.delegates.insert(*holder, *delegate);
        *self.delegated_in.entry(*delegate).or_insert(0) += balance;
        info!("{} delegated votes to {}", holder, delegate);
        Ok(())
    }

    pub fn revoke_delegation(&mut self, holder: &AccountId) -> LedgerResult<()> {
        self.ensure_live()?;
        let delegate = self
            .delegates
            .remove(holder)
            .ok_or_else(|| LedgerError::InvalidOperation("No delegation to revoke".into()))?;
        let balance = self.raw_balance(holder);
        if let Some(entry) = self.delegated_in.get_mut(&delegate) {
            *entry = entry.saturating_sub(balance);
            if *entry == 0 {
                self.delegated_in.remove(&delegate);
            }
        }
        info!("{} revoked delegation to {}", holder, delegate);
        Ok(())
    }

    /// Irreversibly destroy the ledger; every later call fails
    pub fn destroy(&mut self, caller: &AccountId) -> LedgerResult<()> {
        self.only_owner(caller)?;
        self.balances.clear();
        self.delegates.clear();
        self.delegated_in.clear();
        self.total_supply = 0;
        self.destroyed = true;
        info!("Share ledger {} destroyed", self.symbol);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> AccountId {
        AccountId::derive("pool")
    }

    fn ledger() -> ShareLedger {
        ShareLedger::new("Pool Shares", "PS", pool(), 1).unwrap()
    }

    #[test]
    fn test_only_pool_issues() {
        let mut ledger = ledger();
        let alice = AccountId::derive("alice");
        assert!(matches!(
            ledger.issue(&alice, &alice, 10),
            Err(LedgerError::PermissionDenied(_))
        ));
        ledger.issue(&pool(), &alice, 10).unwrap();
        assert_eq!(ledger.balance_of(&alice).unwrap(), 10);
        assert_eq!(ledger.total_supply().unwrap(), 10);
    }

    #[test]
    fn test_quote_issue() {
        let mut ledger = ShareLedger::new("Pool Shares", "PS", pool(), 2).unwrap();
        assert_eq!(ledger.quote_issue(10, 9, 0).unwrap(), 5);
        ledger.issue(&pool(), &AccountId::derive("alice"), 5).unwrap();
        // 5 shares backed by 9 units: 9 more units buy 5 more shares
        assert_eq!(ledger.quote_issue(10, 9, 9).unwrap(), 5);
        assert_eq!(ledger.price(9).unwrap(), 1);
    }

    #[test]
    fn test_seed_price_before_issuance() {
        let ledger = ShareLedger::new("Pool Shares", "PS", pool(), 3).unwrap();
        assert_eq!(ledger.price(0).unwrap(), 3);
        assert!(ShareLedger::new("Pool Shares", "PS", pool(), 0).is_err());
    }

    #[test]
    fn test_delegation_weight() {
        let mut ledger = ledger();
        let alice = AccountId::derive("alice");
        let bob = AccountId::derive("bob");
        ledger.issue(&pool(), &alice, 10).unwrap();
        ledger.issue(&pool(), &bob, 5).unwrap();

        ledger.delegate_votes(&alice, &bob).unwrap();
        assert_eq!(ledger.effective_weight(&alice).unwrap(), 0);
        assert_eq!(ledger.effective_weight(&bob).unwrap(), 15);
        assert_eq!(ledger.balance_of(&alice).unwrap(), 10);

        ledger.revoke_delegation(&alice).unwrap();
        assert_eq!(ledger.effective_weight(&alice).unwrap(), 10);
        assert_eq!(ledger.effective_weight(&bob).unwrap(), 5);
        assert!(ledger.revoke_delegation(&alice).is_err());
        assert!(ledger.delegate_votes(&alice, &alice).is_err());
    }

    #[test]
    fn test_voting_weights_cover_supply() {
        let mut ledger = ledger();
        let alice = AccountId::derive("alice");
        let bob = AccountId::derive("bob");
        let carol = AccountId::derive("carol");
        ledger.issue(&pool(), &alice, 10).unwrap();
        ledger.issue(&pool(), &bob, 5).unwrap();
        ledger.delegate_votes(&alice, &carol).unwrap();

        let weights = ledger.voting_weights().unwrap();
        assert!(!weights.iter().any(|(account, _)| *account == alice));
        assert!(weights.contains(&(carol, 10)));
        assert!(weights.contains(&(bob, 5)));
        let total: Amount = weights.iter().map(|(_, weight)| weight).sum();
        assert_eq!(total, ledger.total_supply().unwrap());
    }

    #[test]
    fn test_transfer_migrates_delegated_weight() {
        let mut ledger = ledger();
        let alice = AccountId::derive("alice");
        let bob = AccountId::derive("bob");
        let carol = AccountId::derive("carol");
        ledger.issue(&pool(), &alice, 10).unwrap();
        ledger.delegate_votes(&alice, &bob).unwrap();

        ledger.transfer(&alice, &carol, 4).unwrap();
        assert_eq!(ledger.effective_weight(&bob).unwrap(), 6);
        assert_eq!(ledger.effective_weight(&carol).unwrap(), 4);

        ledger.delegate_votes(&carol, &bob).unwrap();
        ledger.issue(&pool(), &carol, 1).unwrap();
        assert_eq!(ledger.effective_weight(&bob).unwrap(), 11);
        assert!(ledger.transfer(&alice, &carol, 7).is_err());
    }

    #[test]
    fn test_destroy_is_terminal() {
        let mut ledger = ledger();
        let alice = AccountId::derive("alice");
        ledger.issue(&pool(), &alice, 10).unwrap();
        assert!(ledger.destroy(&alice).is_err());
        ledger.destroy(&pool()).unwrap();

        assert!(ledger.is_destroyed());
        assert_eq!(ledger.balance_of(&alice), Err(LedgerError::Destroyed));
        assert_eq!(ledger.total_supply(), Err(LedgerError::Destroyed));
        assert!(ledger.issue(&pool(), &alice, 1).is_err());
        assert!(ledger.destroy(&pool()).is_err());
    }
}
