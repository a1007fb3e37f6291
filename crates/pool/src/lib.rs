//! Member-owned capital pools.
//!
//! A [`Pool`] takes stakes in a base currency, issues shares against them,
//! and spends its treasury only through proposals its shareholders approve.
//! Members may act directly or sign intents a relayer submits for them.

mod dispatch;
mod state;

pub mod calls;
pub mod directory;
pub mod events;
pub mod host;
pub mod intents;
pub mod membership;
pub mod pool;

pub use directory::{MembershipObserver, PoolDirectory};
pub use events::PoolEvent;
pub use host::{HostState, PoolHost, RelayOutcome, RelayedCall, RelayerGateway};
pub use intents::{
    CashoutIntent, DelegateIntent, JoinIntent, JoinRequestIntent, ProposalIntent, RevokeIntent, SecretIntent,
    VoteIntent, WhitelistIntent,
};
pub use membership::MembershipRegistry;
pub use pool::{pool_address, LaunchParams, Pool};
