//! Proposal execution capability

use coffer_common::{AccountId, Result};

use crate::proposals::Transaction;

/// Runs proposal transactions.
///
/// `origin` is always the pool, never the proposer or whoever triggered
/// execution. Implementations own rollback: if any call of a bundle fails,
/// the effects of the earlier calls must not survive.
pub trait Executor {
    fn execute(&mut self, origin: &AccountId, tx: &Transaction) -> Result<Vec<u8>>;
}
