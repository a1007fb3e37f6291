use std::collections::BTreeMap;

use coffer_common::{AccountId, Amount, Error, Result};
use tracing::{debug, info};

use crate::assets::AssetBook;
use crate::distribution::{pro_rata, Payout, PayoutAsset};
use crate::lottery::allocate_nfts;

/// Holdings a pool tracks for payouts.
///
/// Registration is open to anyone but only records assets the pool really
/// holds. Every mutator that moves assets requires the pool itself as
/// caller, which is only the case inside an executed proposal.
#[derive(Debug, Clone)]
pub struct AssetVault {
    owner: AccountId,
    /// Tracked fungible tokens in registration order
    tokens: Vec<AccountId>,
    /// Tracked NFTs per collection
    nfts: BTreeMap<AccountId, Vec<u64>>,
}

impl AssetVault {
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            tokens: Vec::new(),
            nfts: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn owned_tokens(&self) -> &[AccountId] {
        &self.tokens
    }

    pub fn owned_nft_ids(&self, collection: &AccountId) -> Vec<u64> {
        self.nfts.get(collection).cloned().unwrap_or_default()
    }

    pub fn owned_nfts(&self) -> Vec<(AccountId, u64)> {
        self.nfts
            .iter()
            .flat_map(|(collection, ids)| ids.iter().map(move |id| (*collection, *id)))
            .collect()
    }

    /// Start tracking an asset the pool holds. Returns `false` if it was
    /// already tracked.
    pub fn add_token(&mut self, assets: &AssetBook, token: &AccountId, is_nft: bool, id: u64) -> Result<bool> {
        if is_nft {
            if !assets.is_collection(token) {
                return Err(Error::validation(format!("{} is not an NFT collection", token)));
            }
            if assets.nft_owner(token, id)? != Some(self.owner) {
                return Err(Error::economic(format!("Pool does not own token {} of {}", id, token)));
            }
            let ids = self.nfts.entry(*token).or_default();
            if ids.contains(&id) {
                return Ok(false);
            }
            ids.push(id);
        } else {
            if !assets.is_token(token) {
                return Err(Error::validation(format!("{} is not a fungible token", token)));
            }
            if assets.token_balance(token, &self.owner)? == 0 {
                return Err(Error::economic(format!("Pool does not hold token {}", token)));
            }
            if self.tokens.contains(token) {
                return Ok(false);
            }
            self.tokens.push(*token);
        }
        info!("Vault {} tracking {} (nft: {}, id: {})", self.owner, token, is_nft, id);
        Ok(true)
    }

    /// Drop a stale NFT entry. A no-op while the pool still holds it.
    pub fn remove_nft(&mut self, assets: &AssetBook, collection: &AccountId, id: u64) -> Result<bool> {
        if assets.nft_owner(collection, id)? == Some(self.owner) {
            return Ok(false);
        }
        Ok(self.untrack_nft(collection, id))
    }

    fn untrack_nft(&mut self, collection: &AccountId, id: u64) -> bool {
        let Some(ids) = self.nfts.get_mut(collection) else {
            return false;
        };
        let before = ids.len();
        ids.retain(|tracked| *tracked != id);
        let removed = ids.len() != before;
        if ids.is_empty() {
            self.nfts.remove(collection);
        }
        removed
    }

    fn only_owner(&self, caller: &AccountId) -> Result<()> {
        if *caller != self.owner {
            return Err(Error::authorization("Only Pool"));
        }
        Ok(())
    }

    pub fn transfer_token(
        &mut self,
        caller: &AccountId,
        assets: &mut AssetBook,
        token: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<Payout> {
        self.only_owner(caller)?;
        assets.transfer_token(token, &self.owner, to, amount)?;
        Ok(Payout {
            recipient: *to,
            asset: PayoutAsset::Token(*token),
            amount,
        })
    }

    pub fn transfer_nft(
        &mut self,
        caller: &AccountId,
        assets: &mut AssetBook,
        collection: &AccountId,
        to: &AccountId,
        id: u64,
    ) -> Result<Payout> {
        self.only_owner(caller)?;
        assets.transfer_nft(collection, &self.owner, &self.owner, to, id)?;
        self.untrack_nft(collection, id);
        Ok(Payout {
            recipient: *to,
            asset: PayoutAsset::Nft {
                collection: *collection,
                id,
            },
            amount: 1,
        })
    }

    /// Pay `amount` of `token` across `holders` pro-rata; the rounding
    /// remainder stays in the vault.
    pub fn distribute_token(
        &mut self,
        caller: &AccountId,
        assets: &mut AssetBook,
        token: &AccountId,
        holders: &[(AccountId, Amount)],
        total_weight: Amount,
        amount: Amount,
    ) -> Result<Vec<Payout>> {
        self.only_owner(caller)?;
        let balance = assets.token_balance(token, &self.owner)?;
        if balance < amount {
            return Err(Error::economic(format!(
                "Pool holds {} of {}, cannot distribute {}",
                balance, token, amount
            )));
        }
        let mut payouts = Vec::new();
        for (recipient, share) in pro_rata(amount, holders, total_weight)? {
            assets.transfer_token(token, &self.owner, &recipient, share)?;
            payouts.push(Payout {
                recipient,
                asset: PayoutAsset::Token(*token),
                amount: share,
            });
        }
        debug!("Distributed {} of {} to {} holders", amount, token, payouts.len());
        Ok(payouts)
    }

    pub fn distribute_all_of_token(
        &mut self,
        caller: &AccountId,
        assets: &mut AssetBook,
        token: &AccountId,
        holders: &[(AccountId, Amount)],
        total_weight: Amount,
    ) -> Result<Vec<Payout>> {
        self.only_owner(caller)?;
        let balance = assets.token_balance(token, &self.owner)?;
        self.distribute_token(caller, assets, token, holders, total_weight, balance)
    }

    /// Distribute the full balance of every tracked fungible token
    pub fn distribute_all_tokens(
        &mut self,
        caller: &AccountId,
        assets: &mut AssetBook,
        holders: &[(AccountId, Amount)],
        total_weight: Amount,
    ) -> Result<Vec<Payout>> {
        self.only_owner(caller)?;
        let mut payouts = Vec::new();
        for token in self.tokens.clone() {
            payouts.extend(self.distribute_all_of_token(caller, assets, &token, holders, total_weight)?);
        }
        Ok(payouts)
    }

    pub fn distribute_native(
        &mut self,
        caller: &AccountId,
        assets: &mut AssetBook,
        holders: &[(AccountId, Amount)],
        total_weight: Amount,
        amount: Amount,
    ) -> Result<Vec<Payout>> {
        self.only_owner(caller)?;
        let balance = assets.native_balance(&self.owner);
        if balance < amount {
            return Err(Error::economic("Pool does not have enough funds"));
        }
        let mut payouts = Vec::new();
        for (recipient, share) in pro_rata(amount, holders, total_weight)? {
            assets.transfer_native(&self.owner, &recipient, share)?;
            payouts.push(Payout {
                recipient,
                asset: PayoutAsset::Native,
                amount: share,
            });
        }
        Ok(payouts)
    }

    /// Hand out every tracked NFT the pool still holds by weighted lottery.
    /// Stale entries are dropped.
    pub fn distribute_nfts(
        &mut self,
        caller: &AccountId,
        assets: &mut AssetBook,
        holders: &[(AccountId, Amount)],
        seed: [u8; 32],
    ) -> Result<Vec<Payout>> {
        self.only_owner(caller)?;
        let mut held = Vec::new();
        for (collection, id) in self.owned_nfts() {
            if assets.nft_owner(&collection, id)? == Some(self.owner) {
                held.push((collection, id));
            }
        }
        let awards = allocate_nfts(&held, holders, seed);
        let mut payouts = Vec::with_capacity(awards.len());
        for award in awards {
            assets.transfer_nft(&award.collection, &self.owner, &self.owner, &award.recipient, award.id)?;
            self.untrack_nft(&award.collection, award.id);
            payouts.push(Payout {
                recipient: award.recipient,
                asset: PayoutAsset::Nft {
                    collection: award.collection,
                    id: award.id,
                },
                amount: 1,
            });
        }
        // Whatever is left was stale bookkeeping
        self.nfts.retain(|collection, ids| {
            ids.retain(|id| held.contains(&(*collection, *id)));
            !ids.is_empty()
        });
        Ok(payouts)
    }
}
