//! Pool state that proposal execution can touch, and the operations on it.
//!
//! Kept apart from the proposal engine so an executing proposal can borrow
//! the state mutably while the engine drives it.

use std::collections::BTreeSet;

use coffer_common::{AccountId, Amount, Error, Result};
use coffer_config::PoolSettings;
use coffer_crypto::{sha256, IntentPayload, NonceRegistry, SignedIntent};
use coffer_economic::{AssetVault, Environment, Payout, SeedSource};
use coffer_ledger::{mul_div, ShareLedger};
use tracing::{debug, info};

use crate::events::PoolEvent;
use crate::intents::JoinRequestIntent;
use crate::membership::MembershipRegistry;

/// Membership change waiting for commit before observers hear about it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MembershipChange {
    Added(AccountId),
    Removed(AccountId),
}

#[derive(Debug, Clone)]
pub(crate) struct PoolCore {
    pub(crate) id: AccountId,
    pub(crate) name: String,
    pub(crate) creator: AccountId,
    pub(crate) base_token: AccountId,
    pub(crate) shares: ShareLedger,
    pub(crate) membership: MembershipRegistry,
    pub(crate) vault: AssetVault,
    pub(crate) nonces: NonceRegistry,
    pub(crate) relayers: BTreeSet<AccountId>,
    pub(crate) liquidated: bool,
    pub(crate) events: Vec<PoolEvent>,
    pub(crate) pending: Vec<MembershipChange>,
}

impl PoolCore {
    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.liquidated {
            return Err(Error::state("Pool liquidated"));
        }
        Ok(())
    }

    pub(crate) fn settings(&self, env: &Environment) -> Result<PoolSettings> {
        env.config.settings(&self.id).cloned()
    }

    pub(crate) fn base_held(&self, env: &Environment) -> Result<Amount> {
        env.assets.token_balance(&self.base_token, &self.id)
    }

    /// Verify a relayed intent and consume its nonce if it carries one.
    /// Returns the subject account.
    pub(crate) fn authorize<T: IntentPayload>(
        &mut self,
        relayer: &AccountId,
        intent: &SignedIntent<T>,
    ) -> Result<AccountId> {
        if !self.relayers.contains(relayer) {
            debug!("Rejected relayed call from {}", relayer);
            return Err(Error::authorization("Only Relayer"));
        }
        intent.verify(&self.id)?;
        if let Some(nonce) = intent.nonce() {
            self.nonces.consume(&intent.subject, nonce)?;
        }
        Ok(intent.subject)
    }

    /// Shareholders taking part in a distribution and their combined weight
    pub(crate) fn holders(&self, receivers: Option<&[AccountId]>) -> Result<(Vec<(AccountId, Amount)>, Amount)> {
        match receivers {
            None => Ok((self.shares.holders()?, self.shares.total_supply()?)),
            Some(receivers) => {
                let mut seen = BTreeSet::new();
                let mut holders = Vec::with_capacity(receivers.len());
                for account in receivers {
                    if !seen.insert(*account) {
                        continue;
                    }
                    let balance = self.shares.balance_of(account)?;
                    if balance > 0 {
                        holders.push((*account, balance));
                    }
                }
                let total = holders.iter().map(|(_, balance)| *balance).sum();
                Ok((holders, total))
            }
        }
    }

    pub(crate) fn record_payouts(&mut self, payouts: Vec<Payout>) {
        self.events.extend(payouts.into_iter().map(PoolEvent::Distributed));
    }

    fn add_member(&mut self, account: AccountId) {
        self.membership.add_member(account);
        self.pending.push(MembershipChange::Added(account));
    }

    /// Pull `amount` base currency from `account`: the fee goes to the
    /// treasury, the rest to the pool. Both legs use the allowance the
    /// account gave the pool.
    fn pull_stake(&mut self, env: &mut Environment, account: &AccountId, amount: Amount) -> Result<Amount> {
        let fee = env.config.fee_for(amount);
        let net = amount - fee;
        let treasury = env.config.treasury();
        env.assets
            .transfer_token_from(&self.base_token, &self.id, account, &self.id, net)?;
        if fee > 0 {
            env.assets
                .transfer_token_from(&self.base_token, &self.id, account, &treasury, fee)?;
        }
        if net > 0 {
            self.vault.add_token(&env.assets, &self.base_token, false, 0)?;
        }
        Ok(net)
    }

    /// Take a stake and issue shares priced against current holdings
    fn deposit(&mut self, env: &mut Environment, account: &AccountId, stake: Amount) -> Result<Amount> {
        let held = self.base_held(env)?;
        let net = stake - env.config.fee_for(stake);
        let shares = self.shares.quote_issue(stake, net, held)?;
        if shares == 0 {
            return Err(Error::economic("Stake too small for a single share"));
        }
        self.pull_stake(env, account, stake)?;
        self.shares.issue(&self.id, account, shares)?;
        self.membership.record_investment(account, stake);
        Ok(shares)
    }

    pub(crate) fn join(
        &mut self,
        env: &mut Environment,
        account: AccountId,
        stake: Amount,
        secret: Option<&[u8]>,
    ) -> Result<()> {
        let settings = self.settings(env)?;
        if self.membership.is_member(&account) {
            return Err(Error::membership("Is already a Member"));
        }
        let holds_shares = self.shares.balance_of(&account)? > 0;

        // Holders coming back without new capital
        if stake == 0 && holds_shares {
            self.membership.check_capacity(settings.max_members)?;
            self.add_member(account);
            self.events.push(PoolEvent::Joined { account, stake: 0, shares: 0 });
            info!("{} rejoined pool {}", account, self.id);
            return Ok(());
        }

        if self.membership.is_closed() {
            return Err(Error::state("Pool Closed"));
        }
        let invited = settings.public || holds_shares || self.membership.is_whitelisted(&account);
        let secret_hash = match (invited, secret) {
            (true, _) => None,
            (false, Some(secret)) => {
                let hash = sha256(secret);
                self.membership.check_secret(&hash)?;
                Some(hash)
            }
            (false, None) => return Err(Error::membership("Not on Whitelist")),
        };
        if stake < settings.min_invest {
            return Err(Error::economic("Stake is lower than minInvest"));
        }
        if stake > settings.max_invest {
            return Err(Error::economic("Stake is higher than maxInvest"));
        }
        self.membership.check_capacity(settings.max_members)?;

        if let Some(hash) = secret_hash {
            self.membership.spend_secret(&hash)?;
        }
        let shares = self.deposit(env, &account, stake)?;
        self.add_member(account);
        self.events.push(PoolEvent::Joined { account, stake, shares });
        info!("{} joined pool {} with {} for {} shares", account, self.id, stake, shares);
        Ok(())
    }

    pub(crate) fn fund(&mut self, env: &mut Environment, account: AccountId, amount: Amount) -> Result<()> {
        let settings = self.settings(env)?;
        self.membership.require_member(&account, "Not a Member")?;
        if self.membership.is_closed() {
            return Err(Error::state("Pool Closed"));
        }
        if amount == 0 {
            return Err(Error::validation("Amount must be positive"));
        }
        if self.membership.invested(&account).saturating_add(amount) > settings.max_invest {
            return Err(Error::economic("MaxInvest reached"));
        }
        let shares = self.deposit(env, &account, amount)?;
        self.events.push(PoolEvent::Funded { account, amount, shares });
        info!("{} funded pool {} with {}", account, self.id, amount);
        Ok(())
    }

    /// Redeem every share of `account` for its part of the base currency
    pub(crate) fn cashout(&mut self, env: &mut Environment, account: AccountId) -> Result<Amount> {
        self.membership.require_member(&account, "Not a Member")?;
        let balance = self.shares.balance_of(&account)?;
        let supply = self.shares.total_supply()?;
        let held = self.base_held(env)?;
        let payout = if balance == 0 { 0 } else { mul_div(held, balance, supply)? };

        if payout > 0 {
            env.assets.transfer_token(&self.base_token, &self.id, &account, payout)?;
        }
        if balance > 0 {
            self.shares.burn(&self.id, &account, balance)?;
        }
        self.membership.remove_member(&account);
        self.pending.push(MembershipChange::Removed(account));
        self.events.push(PoolEvent::Cashout { account, amount: payout });
        info!("{} cashed out {} shares for {}", account, balance, payout);
        Ok(payout)
    }

    /// Admit the author of an approved join request
    pub(crate) fn accept_join(&mut self, env: &mut Environment, request: &SignedIntent<JoinRequestIntent>) -> Result<()> {
        request.verify(&self.id)?;
        let nonce = request
            .nonce()
            .ok_or_else(|| Error::authorization("Join request without nonce"))?;
        let applicant = request.subject;
        self.nonces.consume(&applicant, nonce)?;
        if self.membership.is_member(&applicant) {
            return Err(Error::membership("Is already a Member"));
        }
        let settings = self.settings(env)?;
        self.membership.check_capacity(settings.max_members)?;

        let JoinRequestIntent { amount, shares, .. } = request.payload.clone();
        self.pull_stake(env, &applicant, amount)?;
        self.shares.issue(&self.id, &applicant, shares)?;
        self.membership.record_investment(&applicant, amount);
        self.add_member(applicant);
        self.events.push(PoolEvent::Joined {
            account: applicant,
            stake: amount,
            shares,
        });
        info!("Join request of {} accepted: {} for {} shares", applicant, amount, shares);
        Ok(())
    }

    /// Pay everything out and shut the pool down for good
    pub(crate) fn liquidate(&mut self, env: &mut Environment, seed_source: &mut dyn SeedSource) -> Result<()> {
        let (holders, total) = self.holders(None)?;
        if self.base_held(env)? > 0 {
            self.vault.add_token(&env.assets, &self.base_token, false, 0)?;
        }

        let native = env.assets.native_balance(&self.id);
        let mut payouts = self
            .vault
            .distribute_native(&self.id, &mut env.assets, &holders, total, native)?;
        payouts.extend(
            self.vault
                .distribute_all_tokens(&self.id, &mut env.assets, &holders, total)?,
        );
        let mut context = self.id.as_bytes().to_vec();
        context.extend_from_slice(b"/liquidation");
        let seed = seed_source.seed(&context)?;
        payouts.extend(self.vault.distribute_nfts(&self.id, &mut env.assets, &holders, seed)?);
        self.record_payouts(payouts);

        self.shares.destroy(&self.id)?;
        for member in self.membership.clear_members() {
            self.pending.push(MembershipChange::Removed(member));
        }
        self.membership.close();
        self.liquidated = true;
        self.events.push(PoolEvent::Liquidated);
        info!("Pool {} liquidated", self.id);
        Ok(())
    }
}
