use std::collections::HashMap;

use coffer_common::{AccountId, Error, Result};

/// Per-account replay counters for nonce-bound intents
#[derive(Debug, Clone, Default)]
pub struct NonceRegistry {
    nonces: HashMap<AccountId, u64>,
}

impl NonceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nonce expected from `account`
    pub fn current(&self, account: &AccountId) -> u64 {
        self.nonces.get(account).copied().unwrap_or(0)
    }

    /// Check `nonce` against the stored value without consuming it
    pub fn check(&self, account: &AccountId, nonce: u64) -> Result<()> {
        let expected = self.current(account);
        if nonce != expected {
            return Err(Error::authorization(format!(
                "Invalid nonce: expected {}, got {}",
                expected, nonce
            )));
        }
        Ok(())
    }

    /// Check and advance the account's nonce
    pub fn consume(&mut self, account: &AccountId, nonce: u64) -> Result<()> {
        self.check(account, nonce)?;
        *self.nonces.entry(*account).or_insert(0) += 1;
        Ok(())
    }
}
