use std::collections::HashMap;

use coffer_common::{AccountId, Amount, Error, Result};
use tracing::info;

use crate::settings::{
    check_invest_bounds, check_max_members, check_min_invest, check_min_yes_voters,
    check_voting_threshold, check_voting_time,
};
use crate::PoolSettings;

/// Call selectors accepted by [`ConfigRegistry::call`]
pub mod selectors {
    pub const MODIFY_MIN_INVEST: &str = "modifyMinInvest";
    pub const MODIFY_MAX_INVEST: &str = "modifyMaxInvest";
    pub const MODIFY_MAX_MEMBERS: &str = "modifyMaxMembers";
    pub const MODIFY_VOTING_THRESHOLD: &str = "modifyVotingThreshold";
    pub const MODIFY_VOTING_TIME: &str = "modifyVotingTime";
    pub const MODIFY_MIN_YES_VOTERS: &str = "modifyMinYesVoters";
    pub const CHANGE_TREASURY: &str = "changeTreasury";
    pub const CHANGE_FEE: &str = "changeFee";
}

const FEE_DENOMINATOR: Amount = 1000;

/// Shared configuration surface: protocol treasury, fee rate and the
/// settings of every registered pool.
#[derive(Debug, Clone)]
pub struct ConfigRegistry {
    id: AccountId,
    treasury: AccountId,
    fee_per_mille: u32,
    pools: HashMap<AccountId, PoolSettings>,
}

impl ConfigRegistry {
    pub fn new(treasury: AccountId, fee_per_mille: u32) -> Result<Self> {
        check_fee(fee_per_mille)?;
        Ok(Self {
            id: AccountId::derive("coffer/config-registry"),
            treasury,
            fee_per_mille,
            pools: HashMap::new(),
        })
    }

    /// Identity transactions use to target the registry
    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn treasury(&self) -> AccountId {
        self.treasury
    }

    pub fn fee_per_mille(&self) -> u32 {
        self.fee_per_mille
    }

    /// Fee owed on `amount`, rounded down
    pub fn fee_for(&self, amount: Amount) -> Amount {
        amount.saturating_mul(self.fee_per_mille as Amount) / FEE_DENOMINATOR
    }

    pub fn register_pool(&mut self, pool: AccountId, settings: PoolSettings) -> Result<()> {
        settings.validate()?;
        if self.pools.contains_key(&pool) {
            return Err(Error::validation("Pool already registered"));
        }
        self.pools.insert(pool, settings);
        Ok(())
    }

    pub fn settings(&self, pool: &AccountId) -> Result<&PoolSettings> {
        self.pools
            .get(pool)
            .ok_or_else(|| Error::validation(format!("Pool {} not registered", pool)))
    }

    fn own_settings(&mut self, caller: &AccountId) -> Result<&mut PoolSettings> {
        self.pools
            .get_mut(caller)
            .ok_or_else(|| Error::authorization("Only Pool"))
    }

    pub fn modify_min_invest(&mut self, caller: &AccountId, value: Amount) -> Result<()> {
        let settings = self.own_settings(caller)?;
        check_min_invest(value)?;
        check_invest_bounds(value, settings.max_invest)?;
        settings.min_invest = value;
        info!("Pool {} set min invest to {}", caller, value);
        Ok(())
    }

    pub fn modify_max_invest(&mut self, caller: &AccountId, value: Amount) -> Result<()> {
        let settings = self.own_settings(caller)?;
        check_invest_bounds(settings.min_invest, value)?;
        settings.max_invest = value;
        info!("Pool {} set max invest to {}", caller, value);
        Ok(())
    }

    pub fn modify_max_members(&mut self, caller: &AccountId, value: u32) -> Result<()> {
        let settings = self.own_settings(caller)?;
        check_max_members(value)?;
        settings.max_members = value;
        info!("Pool {} set max members to {}", caller, value);
        Ok(())
    }

    pub fn modify_voting_threshold(&mut self, caller: &AccountId, value: u32) -> Result<()> {
        let settings = self.own_settings(caller)?;
        check_voting_threshold(value)?;
        settings.voting_threshold = value;
        info!("Pool {} set voting threshold to {}%", caller, value);
        Ok(())
    }

    pub fn modify_voting_time(&mut self, caller: &AccountId, value: u64) -> Result<()> {
        let settings = self.own_settings(caller)?;
        check_voting_time(value)?;
        settings.voting_time = value;
        info!("Pool {} set voting time to {}s", caller, value);
        Ok(())
    }

    pub fn modify_min_yes_voters(&mut self, caller: &AccountId, value: u32) -> Result<()> {
        let settings = self.own_settings(caller)?;
        check_min_yes_voters(value)?;
        settings.min_yes_voters = value;
        info!("Pool {} set min yes voters to {}", caller, value);
        Ok(())
    }

    pub fn change_treasury(&mut self, caller: &AccountId, treasury: AccountId) -> Result<()> {
        self.only_treasury(caller)?;
        self.treasury = treasury;
        info!("Treasury changed to {}", treasury);
        Ok(())
    }

    pub fn change_fee(&mut self, caller: &AccountId, fee_per_mille: u32) -> Result<()> {
        self.only_treasury(caller)?;
        check_fee(fee_per_mille)?;
        self.fee_per_mille = fee_per_mille;
        info!("Fee changed to {} per mille", fee_per_mille);
        Ok(())
    }

    fn only_treasury(&self, caller: &AccountId) -> Result<()> {
        if *caller != self.treasury {
            return Err(Error::authorization("Only Treasury"));
        }
        Ok(())
    }

    /// Dispatch an encoded call. `params` is the JSON encoding of the single
    /// argument.
    pub fn call(&mut self, caller: &AccountId, selector: &str, params: &[u8]) -> Result<Vec<u8>> {
        match selector {
            selectors::MODIFY_MIN_INVEST => self.modify_min_invest(caller, serde_json::from_slice(params)?),
            selectors::MODIFY_MAX_INVEST => self.modify_max_invest(caller, serde_json::from_slice(params)?),
            selectors::MODIFY_MAX_MEMBERS => self.modify_max_members(caller, serde_json::from_slice(params)?),
            selectors::MODIFY_VOTING_THRESHOLD => {
                self.modify_voting_threshold(caller, serde_json::from_slice(params)?)
            }
            selectors::MODIFY_VOTING_TIME => self.modify_voting_time(caller, serde_json::from_slice(params)?),
            selectors::MODIFY_MIN_YES_VOTERS => {
                self.modify_min_yes_voters(caller, serde_json::from_slice(params)?)
            }
            selectors::CHANGE_TREASURY => self.change_treasury(caller, serde_json::from_slice(params)?),
            selectors::CHANGE_FEE => self.change_fee(caller, serde_json::from_slice(params)?),
            other => Err(Error::validation(format!("Unknown config selector: {}", other))),
        }?;
        Ok(Vec::new())
    }
}

fn check_fee(fee_per_mille: u32) -> Result<()> {
    if fee_per_mille as Amount > FEE_DENOMINATOR {
        return Err(Error::validation("Fee must not exceed 1000 per mille"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_common::ErrorKind;

    fn registry_with_pool() -> (ConfigRegistry, AccountId, AccountId) {
        let treasury = AccountId::derive("treasury");
        let pool = AccountId::derive("pool");
        let mut registry = ConfigRegistry::new(treasury, 30).unwrap();
        registry.register_pool(pool, PoolSettings::new(10, 20)).unwrap();
        (registry, treasury, pool)
    }

    #[test]
    fn test_fee_for() {
        let (registry, _, _) = registry_with_pool();
        assert_eq!(registry.fee_for(1000), 30);
        assert_eq!(registry.fee_for(10), 0);
        assert!(ConfigRegistry::new(AccountId::ZERO, 1001).is_err());
    }

    #[test]
    fn test_only_pool_may_modify_its_settings() {
        let (mut registry, treasury, pool) = registry_with_pool();
        let err = registry.modify_max_members(&treasury, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        registry.modify_max_members(&pool, 3).unwrap();
        assert_eq!(registry.settings(&pool).unwrap().max_members, 3);
    }

    #[test]
    fn test_modify_validates() {
        let (mut registry, _, pool) = registry_with_pool();
        assert_eq!(
            registry.modify_voting_threshold(&pool, 101).unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert!(registry.modify_min_invest(&pool, 25).is_err());
        assert!(registry.modify_max_invest(&pool, 5).is_err());
        registry.modify_max_invest(&pool, 100).unwrap();
        registry.modify_min_invest(&pool, 25).unwrap();
        assert_eq!(registry.settings(&pool).unwrap().min_invest, 25);
    }

    #[test]
    fn test_only_treasury_changes_fee() {
        let (mut registry, treasury, pool) = registry_with_pool();
        assert!(registry.change_fee(&pool, 10).is_err());
        registry.change_fee(&treasury, 10).unwrap();
        assert_eq!(registry.fee_per_mille(), 10);

        let new_treasury = AccountId::derive("new-treasury");
        registry.change_treasury(&treasury, new_treasury).unwrap();
        assert_eq!(registry.treasury(), new_treasury);
        assert!(registry.change_fee(&treasury, 5).is_err());
    }

    #[test]
    fn test_call_dispatch() {
        let (mut registry, _, pool) = registry_with_pool();
        let params = serde_json::to_vec(&75u32).unwrap();
        registry.call(&pool, selectors::MODIFY_VOTING_THRESHOLD, &params).unwrap();
        assert_eq!(registry.settings(&pool).unwrap().voting_threshold, 75);

        let err = registry.call(&pool, "selfDestruct", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = registry.call(&pool, selectors::MODIFY_VOTING_TIME, b"nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }
}
