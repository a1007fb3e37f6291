//! Calls a proposal can make to its own pool.
//!
//! These are the only way to move vault assets: they run with the pool as
//! caller and are reachable solely from proposal execution.

use coffer_common::{AccountId, Amount};
use coffer_crypto::SignedIntent;
use serde::{Deserialize, Serialize};

use crate::intents::JoinRequestIntent;

pub const ADD_TOKEN: &str = "addToken";
pub const REMOVE_NFT: &str = "removeNft";
pub const TRANSFER_TOKEN: &str = "transferToken";
pub const TRANSFER_NFT: &str = "transferNft";
pub const DISTRIBUTE_TOKEN: &str = "distributeToken";
pub const DISTRIBUTE_ALL_OF_TOKEN: &str = "distributeAllOfToken";
pub const DISTRIBUTE_ALL_TOKENS: &str = "distributeAllTokens";
pub const DISTRIBUTE_NATIVE: &str = "distributeNative";
pub const DISTRIBUTE_NFTS: &str = "distributeNfts";
pub const LIQUIDATE_POOL: &str = "liquidatePool";
pub const ACCEPT_JOIN: &str = "acceptJoin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTokenArgs {
    pub token: AccountId,
    pub is_nft: bool,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveNftArgs {
    pub collection: AccountId,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTokenArgs {
    pub token: AccountId,
    pub to: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferNftArgs {
    pub collection: AccountId,
    pub to: AccountId,
    pub id: u64,
}

/// Distribution arguments. Without `receivers` every shareholder takes part;
/// with them, only the listed accounts, weighted among themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributeTokenArgs {
    pub token: AccountId,
    pub amount: Amount,
    #[serde(default)]
    pub receivers: Option<Vec<AccountId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributeAllOfTokenArgs {
    pub token: AccountId,
    #[serde(default)]
    pub receivers: Option<Vec<AccountId>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiversArgs {
    #[serde(default)]
    pub receivers: Option<Vec<AccountId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributeNativeArgs {
    pub amount: Amount,
    #[serde(default)]
    pub receivers: Option<Vec<AccountId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptJoinArgs {
    pub request: SignedIntent<JoinRequestIntent>,
}
