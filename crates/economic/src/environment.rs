use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use coffer_common::{AccountId, Amount, Clock, Error, Result, Timestamp};
use coffer_config::ConfigRegistry;
use tracing::debug;

use crate::assets::AssetBook;
use crate::calls::{self, nft, token};
use crate::contract::{CallContext, Contract};

/// Everything outside a pool that its transactions can touch.
///
/// Cloning produces an independent snapshot; a failed multi-call execution
/// restores the environment from one.
#[derive(Clone)]
pub struct Environment {
    pub assets: AssetBook,
    pub config: ConfigRegistry,
    contracts: BTreeMap<AccountId, Box<dyn Contract>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("assets", &self.assets)
            .field("config", &self.config)
            .field("contracts", &self.contracts.keys().collect::<Vec<_>>())
            .field("now", &self.now())
            .finish()
    }
}

impl Environment {
    pub fn new(config: ConfigRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            assets: AssetBook::new(),
            config,
            contracts: BTreeMap::new(),
            clock,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn register_contract(&mut self, id: AccountId, contract: Box<dyn Contract>) -> Result<()> {
        if id == self.config.id()
            || self.assets.is_token(&id)
            || self.assets.is_collection(&id)
            || self.contracts.contains_key(&id)
        {
            return Err(Error::validation(format!("Address {} already in use", id)));
        }
        self.contracts.insert(id, contract);
        Ok(())
    }

    pub fn has_contract(&self, id: &AccountId) -> bool {
        self.contracts.contains_key(id)
    }

    /// Perform a call as `caller`.
    ///
    /// `value` native currency moves to `target` before the call runs. A
    /// call with an empty selector to an address without code is a plain
    /// transfer.
    pub fn call(
        &mut self,
        caller: &AccountId,
        target: &AccountId,
        selector: &str,
        params: &[u8],
        value: Amount,
    ) -> Result<Vec<u8>> {
        self.assets.transfer_native(caller, target, value)?;
        debug!("Call {} -> {} [{}] value {}", caller, target, selector, value);

        if *target == self.config.id() {
            return self.config.call(caller, selector, params);
        }
        if self.assets.is_token(target) {
            return self.token_call(caller, target, selector, params);
        }
        if self.assets.is_collection(target) {
            return self.nft_call(caller, target, selector, params);
        }
        let now = self.clock.now();
        if let Some(contract) = self.contracts.get_mut(target) {
            let ctx = CallContext {
                caller: *caller,
                this: *target,
                value,
                now,
                assets: &mut self.assets,
            };
            return contract.call(ctx, selector, params);
        }
        if selector.is_empty() {
            return Ok(Vec::new());
        }
        Err(Error::validation(format!("No contract at {}", target)))
    }

    fn token_call(
        &mut self,
        caller: &AccountId,
        target: &AccountId,
        selector: &str,
        params: &[u8],
    ) -> Result<Vec<u8>> {
        match selector {
            token::TRANSFER => {
                let args: calls::TransferArgs = calls::decode(params)?;
                self.assets.transfer_token(target, caller, &args.to, args.amount)?;
                Ok(Vec::new())
            }
            token::APPROVE => {
                let args: calls::ApproveArgs = calls::decode(params)?;
                self.assets.approve(target, caller, &args.spender, args.amount)?;
                Ok(Vec::new())
            }
            token::TRANSFER_FROM => {
                let args: calls::TransferFromArgs = calls::decode(params)?;
                self.assets
                    .transfer_token_from(target, caller, &args.from, &args.to, args.amount)?;
                Ok(Vec::new())
            }
            token::BALANCE_OF => {
                let args: calls::BalanceOfArgs = calls::decode(params)?;
                calls::encode(&self.assets.token_balance(target, &args.account)?)
            }
            other => Err(Error::validation(format!("Unknown token selector: {}", other))),
        }
    }

    fn nft_call(
        &mut self,
        caller: &AccountId,
        target: &AccountId,
        selector: &str,
        params: &[u8],
    ) -> Result<Vec<u8>> {
        match selector {
            nft::TRANSFER_FROM => {
                let args: calls::NftTransferArgs = calls::decode(params)?;
                self.assets
                    .transfer_nft(target, caller, &args.from, &args.to, args.token_id)?;
                Ok(Vec::new())
            }
            nft::APPROVE => {
                let args: calls::NftApproveArgs = calls::decode(params)?;
                self.assets.approve_nft(target, caller, &args.to, args.token_id)?;
                Ok(Vec::new())
            }
            nft::OWNER_OF => {
                let args: calls::OwnerOfArgs = calls::decode(params)?;
                calls::encode(&self.assets.nft_owner(target, args.token_id)?)
            }
            other => Err(Error::validation(format!("Unknown NFT selector: {}", other))),
        }
    }
}
