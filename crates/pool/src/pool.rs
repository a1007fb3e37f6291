//! The pool aggregate: one shared treasury governed by its shareholders.
//!
//! Every state-changing operation runs against a snapshot of the pool and
//! of the environment; on error both are restored, so a failed call leaves
//! no trace (including its events and consumed nonces).

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use coffer_common::{AccountId, Amount, Error, Result};
use coffer_config::PoolSettings;
use coffer_crypto::{sha256, Hash, NonceRegistry, SignedIntent};
use coffer_economic::calls::encode;
use coffer_economic::{AssetVault, Environment, OsSeedSource, SeedSource};
use coffer_governance::{
    Proposal, ProposalDraft, ProposalEngine, Transaction, VoteChoice, VotingRules, WeightSnapshot,
};
use coffer_ledger::ShareLedger;
use tracing::{debug, info, warn};

use crate::calls::{AcceptJoinArgs, ACCEPT_JOIN};
use crate::state::{MembershipChange, PoolCore};
use crate::directory::MembershipObserver;
use crate::dispatch::Dispatch;
use crate::events::PoolEvent;
use crate::intents::*;
use crate::membership::MembershipRegistry;

/// Everything needed to launch a pool
#[derive(Debug, Clone)]
pub struct LaunchParams {
    pub name: String,
    pub creator: AccountId,
    /// Fungible token stakes are paid in
    pub base_token: AccountId,
    pub token_name: String,
    pub token_symbol: String,
    /// Base currency per share while no shares exist
    pub seed_price: Amount,
    pub settings: PoolSettings,
    /// Whitelisted at launch alongside the creator
    pub whitelist: Vec<AccountId>,
    pub relayers: Vec<AccountId>,
}

impl LaunchParams {
    pub fn new(name: &str, creator: AccountId, base_token: AccountId, settings: PoolSettings) -> Self {
        Self {
            name: name.to_string(),
            creator,
            base_token,
            token_name: format!("{} Shares", name),
            token_symbol: "CFS".to_string(),
            seed_price: 1,
            settings,
            whitelist: Vec::new(),
            relayers: Vec::new(),
        }
    }

    pub fn with_token(mut self, name: &str, symbol: &str) -> Self {
        self.token_name = name.to_string();
        self.token_symbol = symbol.to_string();
        self
    }

    pub fn with_seed_price(mut self, seed_price: Amount) -> Self {
        self.seed_price = seed_price;
        self
    }

    pub fn with_whitelist(mut self, accounts: impl IntoIterator<Item = AccountId>) -> Self {
        self.whitelist.extend(accounts);
        self
    }

    pub fn with_relayer(mut self, relayer: AccountId) -> Self {
        self.relayers.push(relayer);
        self
    }
}

pub struct Pool {
    core: PoolCore,
    engine: ProposalEngine,
    seed_source: Box<dyn SeedSource>,
    observer: Option<Arc<dyn MembershipObserver>>,
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.core.id)
            .field("name", &self.core.name)
            .field("members", &self.core.membership.member_count())
            .field("proposals", &self.engine.next_id())
            .field("liquidated", &self.core.liquidated)
            .finish()
    }
}

/// Pool address: a function of creator and name
pub fn pool_address(creator: &AccountId, name: &str) -> AccountId {
    AccountId::derive(&format!("pool/{}/{}", creator.to_hex(), name))
}

impl Pool {
    /// Launch a pool and register its settings with the environment
    pub fn launch(
        env: &mut Environment,
        params: LaunchParams,
        observer: Option<Arc<dyn MembershipObserver>>,
    ) -> Result<Self> {
        if params.name.trim().is_empty() {
            return Err(Error::validation("Missing Pool Name"));
        }
        if !env.assets.is_token(&params.base_token) {
            return Err(Error::validation(format!(
                "Base currency {} is not a token",
                params.base_token
            )));
        }
        let id = pool_address(&params.creator, &params.name);
        let shares = ShareLedger::new(&params.token_name, &params.token_symbol, id, params.seed_price)?;
        env.config.register_pool(id, params.settings)?;

        let whitelist = std::iter::once(params.creator).chain(params.whitelist);
        let core = PoolCore {
            id,
            name: params.name.clone(),
            creator: params.creator,
            base_token: params.base_token,
            shares,
            membership: MembershipRegistry::new(whitelist),
            vault: AssetVault::new(id),
            nonces: NonceRegistry::new(),
            relayers: params.relayers.into_iter().collect::<BTreeSet<_>>(),
            liquidated: false,
            events: vec![PoolEvent::PoolLaunched {
                pool: id,
                creator: params.creator,
                name: params.name.clone(),
            }],
            pending: Vec::new(),
        };
        if let Some(observer) = &observer {
            observer.pool_launched(&id, &params.creator);
        }
        info!("Pool '{}' launched at {} by {}", params.name, id, params.creator);

        Ok(Self {
            core,
            engine: ProposalEngine::new(),
            seed_source: Box::new(OsSeedSource),
            observer,
        })
    }

    /// Replace the source of NFT lottery seeds
    pub fn with_seed_source(mut self, seed_source: Box<dyn SeedSource>) -> Self {
        self.seed_source = seed_source;
        self
    }

    pub fn id(&self) -> AccountId {
        self.core.id
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn creator(&self) -> AccountId {
        self.core.creator
    }

    pub fn base_token(&self) -> AccountId {
        self.core.base_token
    }

    pub fn is_liquidated(&self) -> bool {
        self.core.liquidated
    }

    /// Drain the events emitted since the last call
    pub fn take_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.core.events)
    }

    fn atomically<T>(
        &mut self,
        env: &mut Environment,
        op: impl FnOnce(&mut PoolCore, &mut ProposalEngine, &mut Environment, &mut dyn SeedSource) -> Result<T>,
    ) -> Result<T> {
        self.core.ensure_active()?;
        let core = self.core.clone();
        let engine = self.engine.clone();
        let snapshot = env.clone();
        match op(&mut self.core, &mut self.engine, env, self.seed_source.as_mut()) {
            Ok(value) => {
                self.flush_membership();
                Ok(value)
            }
            Err(e) => {
                debug!("Pool {} rolled back: {}", self.core.id, e);
                self.core = core;
                self.engine = engine;
                *env = snapshot;
                Err(e)
            }
        }
    }

    /// Same as `atomically` for operations that never touch the environment
    fn locally<T>(&mut self, op: impl FnOnce(&mut PoolCore, &mut ProposalEngine) -> Result<T>) -> Result<T> {
        self.core.ensure_active()?;
        let core = self.core.clone();
        let engine = self.engine.clone();
        match op(&mut self.core, &mut self.engine) {
            Ok(value) => {
                self.flush_membership();
                Ok(value)
            }
            Err(e) => {
                self.core = core;
                self.engine = engine;
                Err(e)
            }
        }
    }

    fn flush_membership(&mut self) {
        let pending = std::mem::take(&mut self.core.pending);
        let Some(observer) = &self.observer else {
            return;
        };
        for change in pending {
            match change {
                MembershipChange::Added(member) => observer.member_added(&self.core.id, &member),
                MembershipChange::Removed(member) => observer.member_removed(&self.core.id, &member),
            }
        }
    }

    // ---- Membership ----

    /// Join with `stake` base currency, previously approved to the pool.
    /// Outsiders not on the whitelist may present an invite secret.
    pub fn join(&mut self, env: &mut Environment, caller: AccountId, stake: Amount, secret: Option<&[u8]>) -> Result<()> {
        self.atomically(env, |core, _, env, _| core.join(env, caller, stake, secret))
    }

    pub fn join_for(&mut self, env: &mut Environment, relayer: &AccountId, intent: &SignedIntent<JoinIntent>) -> Result<()> {
        self.atomically(env, |core, _, env, _| {
            let account = core.authorize(relayer, intent)?;
            core.join(env, account, intent.payload.stake, intent.payload.secret.as_deref())
        })
    }

    /// Add more capital, up to the member's `max_invest` in total
    pub fn fund_pool(&mut self, env: &mut Environment, caller: AccountId, amount: Amount) -> Result<()> {
        self.atomically(env, |core, _, env, _| core.fund(env, caller, amount))
    }

    pub fn cashout(&mut self, env: &mut Environment, caller: AccountId) -> Result<Amount> {
        self.atomically(env, |core, _, env, _| core.cashout(env, caller))
    }

    pub fn cashout_for(
        &mut self,
        env: &mut Environment,
        relayer: &AccountId,
        intent: &SignedIntent<CashoutIntent>,
    ) -> Result<Amount> {
        self.atomically(env, |core, _, env, _| {
            let account = core.authorize(relayer, intent)?;
            core.cashout(env, account)
        })
    }

    pub fn add_to_whitelist(&mut self, caller: AccountId, invitee: AccountId) -> Result<()> {
        self.locally(|core, _| whitelist(core, caller, invitee))
    }

    pub fn add_to_whitelist_for(&mut self, relayer: &AccountId, intent: &SignedIntent<WhitelistIntent>) -> Result<()> {
        self.locally(|core, _| {
            let inviter = core.authorize(relayer, intent)?;
            whitelist(core, inviter, intent.payload.invitee)
        })
    }

    /// Register the hash of an invite secret good for `uses` joins
    pub fn add_to_whitelist_with_secret(&mut self, caller: AccountId, hash: Hash, uses: u32) -> Result<()> {
        self.locally(|core, _| register_secret(core, caller, hash, uses))
    }

    pub fn add_to_whitelist_with_secret_for(
        &mut self,
        relayer: &AccountId,
        intent: &SignedIntent<SecretIntent>,
    ) -> Result<()> {
        self.locally(|core, _| {
            let inviter = core.authorize(relayer, intent)?;
            register_secret(core, inviter, intent.payload.hash, intent.payload.uses)
        })
    }

    // ---- Shares ----

    pub fn transfer_shares(&mut self, caller: AccountId, to: AccountId, amount: Amount) -> Result<()> {
        self.locally(|core, _| Ok(core.shares.transfer(&caller, &to, amount)?))
    }

    pub fn delegate(&mut self, caller: AccountId, delegate: AccountId) -> Result<()> {
        self.locally(|core, _| delegate_votes(core, caller, delegate))
    }

    pub fn delegate_for(&mut self, relayer: &AccountId, intent: &SignedIntent<DelegateIntent>) -> Result<()> {
        self.locally(|core, _| {
            let holder = core.authorize(relayer, intent)?;
            delegate_votes(core, holder, intent.payload.delegate)
        })
    }

    pub fn revoke_delegation(&mut self, caller: AccountId) -> Result<()> {
        self.locally(|core, _| revoke(core, caller))
    }

    pub fn revoke_delegation_for(&mut self, relayer: &AccountId, intent: &SignedIntent<RevokeIntent>) -> Result<()> {
        self.locally(|core, _| {
            let holder = core.authorize(relayer, intent)?;
            revoke(core, holder)
        })
    }

    // ---- Governance ----

    pub fn create_proposal(&mut self, env: &mut Environment, caller: AccountId, draft: ProposalDraft) -> Result<u64> {
        self.atomically(env, |core, engine, env, _| propose(core, engine, env, caller, draft))
    }

    /// Relayed proposal; the signature is bound to the id it will receive
    pub fn create_proposal_for(
        &mut self,
        env: &mut Environment,
        relayer: &AccountId,
        intent: &SignedIntent<ProposalIntent>,
    ) -> Result<u64> {
        self.atomically(env, |core, engine, env, _| {
            let creator = core.authorize(relayer, intent)?;
            if intent.payload.proposal_id != engine.next_id() {
                return Err(Error::authorization(format!(
                    "Proposal id mismatch: signed {}, next is {}",
                    intent.payload.proposal_id,
                    engine.next_id()
                )));
            }
            propose(core, engine, env, creator, intent.payload.draft.clone())
        })
    }

    /// Put an outsider's signed buy-in offer to a member vote. The request's
    /// nonce is only consumed when the resulting proposal executes.
    pub fn create_join_proposal(
        &mut self,
        env: &mut Environment,
        relayer: &AccountId,
        request: &SignedIntent<JoinRequestIntent>,
    ) -> Result<u64> {
        self.atomically(env, |core, engine, env, _| {
            if !core.relayers.contains(relayer) {
                return Err(Error::authorization("Only Relayer"));
            }
            request.verify(&core.id)?;
            let nonce = request
                .nonce()
                .ok_or_else(|| Error::authorization("Join request without nonce"))?;
            core.nonces.check(&request.subject, nonce)?;
            let applicant = request.subject;
            if core.membership.is_member(&applicant) {
                return Err(Error::membership("Is already a Member"));
            }
            let offer = &request.payload;
            if offer.amount == 0 || offer.shares == 0 {
                return Err(Error::validation("Join request must offer funds for shares"));
            }
            let settings = core.settings(env)?;
            let params = encode(&AcceptJoinArgs {
                request: request.clone(),
            })?;
            let now = env.now();
            let id = engine.create(
                applicant,
                offer.title.clone(),
                offer.description.clone(),
                vec![Transaction::new(core.id, ACCEPT_JOIN, params)],
                now + settings.voting_time,
                now,
                WeightSnapshot::new(core.shares.voting_weights()?),
                false,
            )?;
            core.events.push(PoolEvent::ProposalCreated {
                id,
                creator: applicant,
                title: offer.title.clone(),
            });
            Ok(id)
        })
    }

    pub fn vote(&mut self, env: &mut Environment, caller: AccountId, proposal_id: u64, choice: VoteChoice) -> Result<()> {
        self.atomically(env, |core, engine, env, _| {
            cast_vote(core, engine, env, caller, proposal_id, choice)
        })
    }

    pub fn vote_for(&mut self, env: &mut Environment, relayer: &AccountId, intent: &SignedIntent<VoteIntent>) -> Result<()> {
        self.atomically(env, |core, engine, env, _| {
            let voter = core.authorize(relayer, intent)?;
            cast_vote(core, engine, env, voter, intent.payload.proposal_id, intent.payload.choice)
        })
    }

    /// Execute an approved proposal. Anyone may trigger it; all of its
    /// transactions succeed or none do.
    pub fn execute_proposal(&mut self, env: &mut Environment, executor: AccountId, proposal_id: u64) -> Result<Vec<Vec<u8>>> {
        self.atomically(env, |core, engine, env, seed_source| {
            let rules = VotingRules::from(&core.settings(env)?);
            let available = env.assets.native_balance(&core.id);
            let now = env.now();
            let origin = core.id;
            let mut dispatch = Dispatch {
                core: &mut *core,
                env: &mut *env,
                seed_source,
            };
            let return_data = engine.execute(proposal_id, &origin, &rules, now, available, &mut dispatch)?;
            core.events.push(PoolEvent::ProposalExecuted {
                id: proposal_id,
                executor,
                return_data: return_data.clone(),
            });
            Ok(return_data)
        })
        .map_err(|e| {
            warn!("Execution of proposal {} failed: {}", proposal_id, e);
            e
        })
    }

    /// Liquidate a pool whose scheduled liquidation time has passed
    pub fn liquidate_pool(&mut self, env: &mut Environment, caller: AccountId) -> Result<()> {
        self.atomically(env, |core, _, env, seed_source| {
            let settings = core.settings(env)?;
            match settings.auto_liquidate_at {
                Some(at) if env.now() >= at => {
                    info!("Auto-liquidation of {} triggered by {}", core.id, caller);
                    core.liquidate(env, seed_source)
                }
                _ => Err(Error::state("Cannot be liquidated")),
            }
        })
    }

    // ---- Vault bookkeeping ----

    /// Start tracking an asset the pool holds. Open to anyone; returns
    /// whether anything changed.
    pub fn add_token(&mut self, env: &Environment, token: AccountId, is_nft: bool, id: u64) -> Result<bool> {
        self.locally(|core, _| {
            let added = core.vault.add_token(&env.assets, &token, is_nft, id)?;
            if added {
                core.events.push(PoolEvent::TokenAdded { token, is_nft, id });
            }
            Ok(added)
        })
    }

    /// Forget an NFT the pool no longer holds
    pub fn remove_nft(&mut self, env: &Environment, collection: AccountId, id: u64) -> Result<bool> {
        self.locally(|core, _| core.vault.remove_nft(&env.assets, &collection, id))
    }

    // ---- Queries ----

    pub fn governance_tokens_of(&self, account: &AccountId) -> Result<Amount> {
        self.core.ensure_active()?;
        Ok(self.core.shares.balance_of(account)?)
    }

    pub fn total_governance_tokens(&self) -> Result<Amount> {
        self.core.ensure_active()?;
        Ok(self.core.shares.total_supply()?)
    }

    /// Base currency held per share
    pub fn governance_token_price(&self, env: &Environment) -> Result<Amount> {
        self.core.ensure_active()?;
        Ok(self.core.shares.price(self.core.base_held(env)?)?)
    }

    pub fn voting_weight_of(&self, account: &AccountId) -> Result<Amount> {
        self.core.ensure_active()?;
        Ok(self.core.shares.effective_weight(account)?)
    }

    pub fn delegate_of(&self, account: &AccountId) -> Result<Option<AccountId>> {
        self.core.ensure_active()?;
        Ok(self.core.shares.delegate_of(account)?)
    }

    pub fn get_proposal(&self, proposal_id: u64) -> Result<&Proposal> {
        self.core.ensure_active()?;
        self.engine.get_proposal(proposal_id)
    }

    pub fn get_transaction(&self, proposal_id: u64, index: usize) -> Result<&Transaction> {
        self.core.ensure_active()?;
        self.engine.get_transaction(proposal_id, index)
    }

    pub fn get_all_proposal_ids(&self) -> Result<Vec<u64>> {
        self.core.ensure_active()?;
        Ok(self.engine.all_proposal_ids())
    }

    pub fn get_all_open_proposal_ids(&self) -> Result<Vec<u64>> {
        self.core.ensure_active()?;
        Ok(self.engine.open_proposal_ids().to_vec())
    }

    pub fn has_voted(&self, proposal_id: u64, account: &AccountId) -> Result<bool> {
        self.core.ensure_active()?;
        self.engine.has_voted(proposal_id, account)
    }

    pub fn next_proposal_id(&self) -> u64 {
        self.engine.next_id()
    }

    pub fn is_member(&self, account: &AccountId) -> Result<bool> {
        self.core.ensure_active()?;
        Ok(self.core.membership.is_member(account))
    }

    pub fn is_whitelisted(&self, account: &AccountId) -> Result<bool> {
        self.core.ensure_active()?;
        Ok(self.core.membership.is_whitelisted(account))
    }

    pub fn members(&self) -> Result<Vec<AccountId>> {
        self.core.ensure_active()?;
        Ok(self.core.membership.members())
    }

    pub fn whitelist(&self) -> Result<Vec<AccountId>> {
        self.core.ensure_active()?;
        Ok(self.core.membership.whitelist())
    }

    /// Remaining uses of the invite behind `secret`
    pub fn secret_uses(&self, secret: &[u8]) -> Result<Option<u32>> {
        self.core.ensure_active()?;
        Ok(self.core.membership.secret_uses(&sha256(secret)))
    }

    pub fn invested(&self, account: &AccountId) -> Result<Amount> {
        self.core.ensure_active()?;
        Ok(self.core.membership.invested(account))
    }

    pub fn is_closed(&self) -> Result<bool> {
        self.core.ensure_active()?;
        Ok(self.core.membership.is_closed())
    }

    pub fn owned_tokens(&self) -> Result<Vec<AccountId>> {
        self.core.ensure_active()?;
        Ok(self.core.vault.owned_tokens().to_vec())
    }

    pub fn owned_nft_ids(&self, collection: &AccountId) -> Result<Vec<u64>> {
        self.core.ensure_active()?;
        Ok(self.core.vault.owned_nft_ids(collection))
    }

    /// Next nonce `account` must sign with
    pub fn nonce_of(&self, account: &AccountId) -> Result<u64> {
        self.core.ensure_active()?;
        Ok(self.core.nonces.current(account))
    }

    pub fn is_relayer(&self, account: &AccountId) -> bool {
        self.core.relayers.contains(account)
    }
}

fn whitelist(core: &mut PoolCore, inviter: AccountId, invitee: AccountId) -> Result<()> {
    core.membership.add_to_whitelist(&inviter, invitee)?;
    core.events.push(PoolEvent::Whitelisted { inviter, invitee });
    Ok(())
}

fn register_secret(core: &mut PoolCore, inviter: AccountId, hash: Hash, uses: u32) -> Result<()> {
    core.membership.register_secret(&inviter, hash, uses)?;
    core.events.push(PoolEvent::SecretRegistered { inviter, uses });
    Ok(())
}

fn delegate_votes(core: &mut PoolCore, holder: AccountId, delegate: AccountId) -> Result<()> {
    core.membership.require_member(&holder, "Only Members can delegate")?;
    core.shares.delegate_votes(&holder, &delegate)?;
    debug!("{} delegated votes to {}", holder, delegate);
    Ok(())
}

fn revoke(core: &mut PoolCore, holder: AccountId) -> Result<()> {
    core.membership.require_member(&holder, "Only Members can delegate")?;
    Ok(core.shares.revoke_delegation(&holder)?)
}

fn propose(
    core: &mut PoolCore,
    engine: &mut ProposalEngine,
    env: &Environment,
    creator: AccountId,
    draft: ProposalDraft,
) -> Result<u64> {
    core.membership
        .require_member(&creator, "Only Members can create proposals")?;
    let (title, description, transactions) = draft.into_transactions()?;
    let settings = core.settings(env)?;
    let now = env.now();
    let id = engine.create(
        creator,
        title.clone(),
        description,
        transactions,
        now + settings.voting_time,
        now,
        WeightSnapshot::new(core.shares.voting_weights()?),
        true,
    )?;
    core.events.push(PoolEvent::ProposalCreated { id, creator, title });
    Ok(id)
}

fn cast_vote(
    core: &mut PoolCore,
    engine: &mut ProposalEngine,
    env: &Environment,
    voter: AccountId,
    proposal_id: u64,
    choice: VoteChoice,
) -> Result<()> {
    core.membership.require_member(&voter, "Only Members can vote")?;
    let weight = core.shares.effective_weight(&voter)?;
    engine.vote(voter, proposal_id, choice, weight, env.now())?;
    core.events.push(PoolEvent::Voted {
        id: proposal_id,
        voter,
        choice,
    });
    Ok(())
}
