//! Economic layer for Coffer pools
//!
//! [`AssetBook`] holds every balance of the shared ledger a pool lives on:
//! native currency, fungible tokens and NFT collections. [`Environment`]
//! routes encoded calls to those assets, to the [`ConfigRegistry`] and to
//! plugged-in [`Contract`]s. [`AssetVault`] tracks what a pool owns and
//! pays it out.
//!
//! [`ConfigRegistry`]: coffer_config::ConfigRegistry

pub mod assets;
pub mod calls;
pub mod contract;
pub mod distribution;
pub mod environment;
pub mod exchange;
pub mod lottery;
pub mod vault;

pub use assets::{AssetBook, FungibleToken, NftCollection};
pub use contract::{CallContext, Contract};
pub use distribution::{pro_rata, Payout, PayoutAsset};
pub use environment::Environment;
pub use exchange::FixedRateExchange;
pub use lottery::{allocate_nfts, CommitRevealSeed, FixedSeed, NftAward, OsSeedSource, SeedSource};
pub use vault::AssetVault;
