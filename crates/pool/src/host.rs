//! Shared, async access to an environment and the pools living in it.
//!
//! A single `RwLock` guards the environment together with every pool, so a
//! transaction sees and commits one consistent state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use coffer_common::{AccountId, Amount, Error, Result};
use coffer_crypto::SignedIntent;
use coffer_economic::Environment;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::directory::MembershipObserver;
use crate::intents::*;
use crate::pool::{LaunchParams, Pool};

#[derive(Debug)]
pub struct HostState {
    pub env: Environment,
    pub pools: HashMap<AccountId, Pool>,
}

impl HostState {
    pub fn pool(&self, id: &AccountId) -> Result<&Pool> {
        self.pools
            .get(id)
            .ok_or_else(|| Error::validation(format!("Unknown pool {}", id)))
    }

    /// The pool and the environment, borrowed together
    pub fn pool_mut(&mut self, id: &AccountId) -> Result<(&mut Pool, &mut Environment)> {
        let pool = self
            .pools
            .get_mut(id)
            .ok_or_else(|| Error::validation(format!("Unknown pool {}", id)))?;
        Ok((pool, &mut self.env))
    }
}

#[derive(Clone)]
pub struct PoolHost {
    inner: Arc<RwLock<HostState>>,
    observer: Option<Arc<dyn MembershipObserver>>,
}

impl PoolHost {
    pub fn new(env: Environment) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HostState {
                env,
                pools: HashMap::new(),
            })),
            observer: None,
        }
    }

    /// Report membership changes of every pool launched from now on
    pub fn with_observer(mut self, observer: Arc<dyn MembershipObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub async fn launch(&self, params: LaunchParams) -> Result<AccountId> {
        let mut state = self.inner.write().await;
        let pool = Pool::launch(&mut state.env, params, self.observer.clone())?;
        let id = pool.id();
        state.pools.insert(id, pool);
        info!("Host now serves {} pools", state.pools.len());
        Ok(id)
    }

    /// Run `op` against a pool with exclusive access
    pub async fn transact<T>(
        &self,
        pool: &AccountId,
        op: impl FnOnce(&mut Pool, &mut Environment) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.inner.write().await;
        let (pool, env) = state.pool_mut(pool)?;
        op(pool, env)
    }

    pub async fn read<T>(&self, pool: &AccountId, op: impl FnOnce(&Pool, &Environment) -> Result<T>) -> Result<T> {
        let state = self.inner.read().await;
        op(state.pool(pool)?, &state.env)
    }

    /// Direct access to the environment, e.g. for funding accounts
    pub async fn with_env<T>(&self, op: impl FnOnce(&mut Environment) -> T) -> T {
        let mut state = self.inner.write().await;
        op(&mut state.env)
    }
}

/// A signed action submitted by a relayer on a member's behalf
#[derive(Debug, Clone)]
pub enum RelayedCall {
    Join(SignedIntent<JoinIntent>),
    Whitelist(SignedIntent<WhitelistIntent>),
    Secret(SignedIntent<SecretIntent>),
    Propose(SignedIntent<ProposalIntent>),
    JoinRequest(SignedIntent<JoinRequestIntent>),
    Vote(SignedIntent<VoteIntent>),
    Cashout(SignedIntent<CashoutIntent>),
    Delegate(SignedIntent<DelegateIntent>),
    Revoke(SignedIntent<RevokeIntent>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Done,
    ProposalId(u64),
    Payout(Amount),
}

#[async_trait]
pub trait RelayerGateway: Send + Sync {
    async fn submit(&self, relayer: &AccountId, pool: &AccountId, call: RelayedCall) -> Result<RelayOutcome>;
}

#[async_trait]
impl RelayerGateway for PoolHost {
    async fn submit(&self, relayer: &AccountId, pool: &AccountId, call: RelayedCall) -> Result<RelayOutcome> {
        debug!("Relayer {} submits to pool {}", relayer, pool);
        self.transact(pool, |pool, env| match &call {
            RelayedCall::Join(intent) => pool.join_for(env, relayer, intent).map(|_| RelayOutcome::Done),
            RelayedCall::Whitelist(intent) => pool.add_to_whitelist_for(relayer, intent).map(|_| RelayOutcome::Done),
            RelayedCall::Secret(intent) => pool
                .add_to_whitelist_with_secret_for(relayer, intent)
                .map(|_| RelayOutcome::Done),
            RelayedCall::Propose(intent) => pool
                .create_proposal_for(env, relayer, intent)
                .map(RelayOutcome::ProposalId),
            RelayedCall::JoinRequest(intent) => pool
                .create_join_proposal(env, relayer, intent)
                .map(RelayOutcome::ProposalId),
            RelayedCall::Vote(intent) => pool.vote_for(env, relayer, intent).map(|_| RelayOutcome::Done),
            RelayedCall::Cashout(intent) => pool.cashout_for(env, relayer, intent).map(RelayOutcome::Payout),
            RelayedCall::Delegate(intent) => pool.delegate_for(relayer, intent).map(|_| RelayOutcome::Done),
            RelayedCall::Revoke(intent) => pool.revoke_delegation_for(relayer, intent).map(|_| RelayOutcome::Done),
        })
        .await
    }
}
