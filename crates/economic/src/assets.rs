//! Balances of the shared ledger pools operate on

use std::collections::BTreeMap;

use coffer_common::{AccountId, Amount, Error, Result};
use tracing::debug;

/// A fungible token and its balances
#[derive(Debug, Clone, Default)]
pub struct FungibleToken {
    pub symbol: String,
    pub total_supply: Amount,
    balances: BTreeMap<AccountId, Amount>,
    /// (owner, spender) -> remaining allowance
    allowances: BTreeMap<(AccountId, AccountId), Amount>,
}

impl FungibleToken {
    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    fn move_balance(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<()> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(Error::economic(format!(
                "Insufficient {} balance: {} holds {}, needs {}",
                self.symbol, from, balance, amount
            )));
        }
        self.balances.insert(*from, balance - amount);
        *self.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }
}

/// An NFT collection: token id -> owner
#[derive(Debug, Clone, Default)]
pub struct NftCollection {
    pub name: String,
    owners: BTreeMap<u64, AccountId>,
    approvals: BTreeMap<u64, AccountId>,
}

impl NftCollection {
    pub fn owner_of(&self, id: u64) -> Option<AccountId> {
        self.owners.get(&id).copied()
    }

    /// Token ids held by `account`
    pub fn tokens_of(&self, account: &AccountId) -> Vec<u64> {
        self.owners
            .iter()
            .filter(|(_, owner)| *owner == account)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssetBook {
    native: BTreeMap<AccountId, Amount>,
    tokens: BTreeMap<AccountId, FungibleToken>,
    collections: BTreeMap<AccountId, NftCollection>,
}

impl AssetBook {
    pub fn new() -> Self {
        Self::default()
    }

    // Native currency

    pub fn native_balance(&self, account: &AccountId) -> Amount {
        self.native.get(account).copied().unwrap_or(0)
    }

    pub fn mint_native(&mut self, to: &AccountId, amount: Amount) {
        *self.native.entry(*to).or_insert(0) += amount;
    }

    pub fn transfer_native(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.native_balance(from);
        if balance < amount {
            return Err(Error::economic(format!(
                "Insufficient native balance: {} holds {}, needs {}",
                from, balance, amount
            )));
        }
        self.native.insert(*from, balance - amount);
        *self.native.entry(*to).or_insert(0) += amount;
        debug!("Native transfer {} -> {}: {}", from, to, amount);
        Ok(())
    }

    // Fungible tokens

    /// Register a token; its identity is derived from the symbol
    pub fn create_token(&mut self, symbol: &str) -> Result<AccountId> {
        let id = AccountId::derive(&format!("token/{}", symbol));
        if self.tokens.contains_key(&id) {
            return Err(Error::validation(format!("Token {} already exists", symbol)));
        }
        self.tokens.insert(
            id,
            FungibleToken {
                symbol: symbol.to_string(),
                ..Default::default()
            },
        );
        Ok(id)
    }

    pub fn is_token(&self, id: &AccountId) -> bool {
        self.tokens.contains_key(id)
    }

    pub fn token(&self, id: &AccountId) -> Result<&FungibleToken> {
        self.tokens
            .get(id)
            .ok_or_else(|| Error::validation(format!("Unknown token {}", id)))
    }

    fn token_mut(&mut self, id: &AccountId) -> Result<&mut FungibleToken> {
        self.tokens
            .get_mut(id)
            .ok_or_else(|| Error::validation(format!("Unknown token {}", id)))
    }

    pub fn mint_token(&mut self, token: &AccountId, to: &AccountId, amount: Amount) -> Result<()> {
        let token = self.token_mut(token)?;
        token.total_supply += amount;
        *token.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }

    pub fn token_balance(&self, token: &AccountId, account: &AccountId) -> Result<Amount> {
        Ok(self.token(token)?.balance_of(account))
    }

    pub fn transfer_token(
        &mut self,
        token: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<()> {
        self.token_mut(token)?.move_balance(from, to, amount)
    }

    pub fn approve(
        &mut self,
        token: &AccountId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<()> {
        self.token_mut(token)?
            .allowances
            .insert((*owner, *spender), amount);
        Ok(())
    }

    pub fn allowance(&self, token: &AccountId, owner: &AccountId, spender: &AccountId) -> Result<Amount> {
        Ok(self.token(token)?.allowance(owner, spender))
    }

    /// Move `amount` from `from` to `to` using `spender`'s allowance
    pub fn transfer_token_from(
        &mut self,
        token: &AccountId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<()> {
        let token = self.token_mut(token)?;
        let allowed = token.allowance(from, spender);
        if allowed < amount {
            return Err(Error::economic(format!(
                "Insufficient {} allowance: {} of {} approved",
                token.symbol, allowed, amount
            )));
        }
        token.move_balance(from, to, amount)?;
        token.allowances.insert((*from, *spender), allowed - amount);
        Ok(())
    }

    // NFT collections

    pub fn create_collection(&mut self, name: &str) -> Result<AccountId> {
        let id = AccountId::derive(&format!("collection/{}", name));
        if self.collections.contains_key(&id) {
            return Err(Error::validation(format!("Collection {} already exists", name)));
        }
        self.collections.insert(
            id,
            NftCollection {
                name: name.to_string(),
                ..Default::default()
            },
        );
        Ok(id)
    }

    pub fn is_collection(&self, id: &AccountId) -> bool {
        self.collections.contains_key(id)
    }

    pub fn collection(&self, id: &AccountId) -> Result<&NftCollection> {
        self.collections
            .get(id)
            .ok_or_else(|| Error::validation(format!("Unknown collection {}", id)))
    }

    fn collection_mut(&mut self, id: &AccountId) -> Result<&mut NftCollection> {
        self.collections
            .get_mut(id)
            .ok_or_else(|| Error::validation(format!("Unknown collection {}", id)))
    }

    pub fn mint_nft(&mut self, collection: &AccountId, to: &AccountId, id: u64) -> Result<()> {
        let collection = self.collection_mut(collection)?;
        if collection.owners.contains_key(&id) {
            return Err(Error::validation(format!("Token {} already minted", id)));
        }
        collection.owners.insert(id, *to);
        Ok(())
    }

    pub fn nft_owner(&self, collection: &AccountId, id: u64) -> Result<Option<AccountId>> {
        Ok(self.collection(collection)?.owner_of(id))
    }

    pub fn approve_nft(&mut self, collection: &AccountId, caller: &AccountId, to: &AccountId, id: u64) -> Result<()> {
        let collection = self.collection_mut(collection)?;
        if collection.owner_of(id) != Some(*caller) {
            return Err(Error::authorization("Caller is not the token owner"));
        }
        collection.approvals.insert(id, *to);
        Ok(())
    }

    /// Move an NFT; `caller` must own it or be approved for it
    pub fn transfer_nft(
        &mut self,
        collection: &AccountId,
        caller: &AccountId,
        from: &AccountId,
        to: &AccountId,
        id: u64,
    ) -> Result<()> {
        let collection = self.collection_mut(collection)?;
        let owner = collection
            .owner_of(id)
            .ok_or_else(|| Error::validation(format!("Token {} does not exist", id)))?;
        if owner != *from {
            return Err(Error::economic(format!("{} does not own token {}", from, id)));
        }
        let approved = collection.approvals.get(&id) == Some(caller);
        if *caller != owner && !approved {
            return Err(Error::authorization("Caller is not owner nor approved"));
        }
        collection.approvals.remove(&id);
        collection.owners.insert(id, *to);
        Ok(())
    }
}
