//! Runs the transactions of an approved proposal.
//!
//! Calls addressed to the pool itself are handled here; everything else is
//! routed through the environment with the pool as caller.

use coffer_common::{AccountId, Error, Result};
use coffer_economic::calls::{decode, encode};
use coffer_economic::{Environment, SeedSource};
use coffer_governance::{Executor, Transaction};
use tracing::{debug, info};

use crate::calls::{self, *};
use crate::state::PoolCore;
use crate::events::PoolEvent;

pub(crate) struct Dispatch<'a> {
    pub(crate) core: &'a mut PoolCore,
    pub(crate) env: &'a mut Environment,
    pub(crate) seed_source: &'a mut dyn SeedSource,
}

impl Executor for Dispatch<'_> {
    fn execute(&mut self, origin: &AccountId, tx: &Transaction) -> Result<Vec<u8>> {
        let data = if tx.target == self.core.id {
            self.self_call(origin, tx)?
        } else {
            self.env
                .call(origin, &tx.target, &tx.selector, &tx.params, tx.value)?
        };

        // Acting on funds freezes the membership for good. Admitting a
        // member brings capital in and does not count.
        let admits = tx.target == self.core.id && tx.selector == calls::ACCEPT_JOIN;
        if tx.target != self.env.config.id() && !admits && self.core.membership.close() {
            self.core.events.push(PoolEvent::PoolClosed);
            info!("Pool {} closed by call to {}", self.core.id, tx.target);
        }
        Ok(data)
    }
}

impl Dispatch<'_> {
    fn self_call(&mut self, origin: &AccountId, tx: &Transaction) -> Result<Vec<u8>> {
        if *origin != self.core.id {
            return Err(Error::authorization("Only Pool"));
        }
        debug!("Pool {} self-call {}", self.core.id, tx.selector);
        let core = &mut *self.core;
        let env = &mut *self.env;

        match tx.selector.as_str() {
            calls::ADD_TOKEN => {
                let args: AddTokenArgs = decode(&tx.params)?;
                let added = core.vault.add_token(&env.assets, &args.token, args.is_nft, args.id)?;
                if added {
                    core.events.push(PoolEvent::TokenAdded {
                        token: args.token,
                        is_nft: args.is_nft,
                        id: args.id,
                    });
                }
                encode(&added)
            }
            calls::REMOVE_NFT => {
                let args: RemoveNftArgs = decode(&tx.params)?;
                let removed = core.vault.remove_nft(&env.assets, &args.collection, args.id)?;
                encode(&removed)
            }
            calls::TRANSFER_TOKEN => {
                let args: TransferTokenArgs = decode(&tx.params)?;
                let payout = core
                    .vault
                    .transfer_token(origin, &mut env.assets, &args.token, &args.to, args.amount)?;
                core.record_payouts(vec![payout]);
                Ok(Vec::new())
            }
            calls::TRANSFER_NFT => {
                let args: TransferNftArgs = decode(&tx.params)?;
                let payout = core
                    .vault
                    .transfer_nft(origin, &mut env.assets, &args.collection, &args.to, args.id)?;
                core.record_payouts(vec![payout]);
                Ok(Vec::new())
            }
            calls::DISTRIBUTE_TOKEN => {
                let args: DistributeTokenArgs = decode(&tx.params)?;
                let (holders, total) = core.holders(args.receivers.as_deref())?;
                let payouts = core.vault.distribute_token(
                    origin,
                    &mut env.assets,
                    &args.token,
                    &holders,
                    total,
                    args.amount,
                )?;
                core.record_payouts(payouts);
                Ok(Vec::new())
            }
            calls::DISTRIBUTE_ALL_OF_TOKEN => {
                let args: DistributeAllOfTokenArgs = decode(&tx.params)?;
                let (holders, total) = core.holders(args.receivers.as_deref())?;
                let payouts =
                    core.vault
                        .distribute_all_of_token(origin, &mut env.assets, &args.token, &holders, total)?;
                core.record_payouts(payouts);
                Ok(Vec::new())
            }
            calls::DISTRIBUTE_ALL_TOKENS => {
                let args: ReceiversArgs = decode_or_default(&tx.params)?;
                let (holders, total) = core.holders(args.receivers.as_deref())?;
                let payouts = core
                    .vault
                    .distribute_all_tokens(origin, &mut env.assets, &holders, total)?;
                core.record_payouts(payouts);
                Ok(Vec::new())
            }
            calls::DISTRIBUTE_NATIVE => {
                let args: DistributeNativeArgs = decode(&tx.params)?;
                let (holders, total) = core.holders(args.receivers.as_deref())?;
                let payouts = core
                    .vault
                    .distribute_native(origin, &mut env.assets, &holders, total, args.amount)?;
                core.record_payouts(payouts);
                Ok(Vec::new())
            }
            calls::DISTRIBUTE_NFTS => {
                let args: ReceiversArgs = decode_or_default(&tx.params)?;
                let (holders, _) = core.holders(args.receivers.as_deref())?;
                let mut context = core.id.as_bytes().to_vec();
                context.extend_from_slice(b"/distributeNfts");
                let seed = self.seed_source.seed(&context)?;
                let payouts = core.vault.distribute_nfts(origin, &mut env.assets, &holders, seed)?;
                core.record_payouts(payouts);
                Ok(Vec::new())
            }
            calls::LIQUIDATE_POOL => {
                core.liquidate(env, &mut *self.seed_source)?;
                Ok(Vec::new())
            }
            calls::ACCEPT_JOIN => {
                let args: AcceptJoinArgs = decode(&tx.params)?;
                core.accept_join(env, &args.request)?;
                Ok(Vec::new())
            }
            other => Err(Error::validation(format!("Unknown pool function: {}", other))),
        }
    }
}

/// Argument-free calls may leave `params` empty
fn decode_or_default<T: serde::de::DeserializeOwned + Default>(params: &[u8]) -> Result<T> {
    if params.is_empty() {
        Ok(T::default())
    } else {
        decode(params)
    }
}
