use std::fmt;

use coffer_common::{AccountId, Amount, Result, Timestamp};

use crate::assets::AssetBook;

/// What a contract sees when it is called
pub struct CallContext<'a> {
    /// Immediate caller
    pub caller: AccountId,
    /// The contract's own identity
    pub this: AccountId,
    /// Native value already moved to `this`
    pub value: Amount,
    pub now: Timestamp,
    pub assets: &'a mut AssetBook,
}

/// An external call target plugged into the [`Environment`](crate::Environment).
///
/// Contracts must be cloneable so the environment can be snapshotted and
/// restored when a multi-call execution fails.
pub trait Contract: fmt::Debug + Send + Sync {
    fn call(&mut self, ctx: CallContext<'_>, selector: &str, params: &[u8]) -> Result<Vec<u8>>;

    fn clone_box(&self) -> Box<dyn Contract>;
}

impl Clone for Box<dyn Contract> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
