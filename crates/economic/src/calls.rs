//! Selectors and argument encodings for calls routed by [`Environment`].
//!
//! Arguments are JSON-encoded structs; a proposal transaction carries them
//! as opaque bytes until the target decodes them.
//!
//! [`Environment`]: crate::Environment

use coffer_common::{AccountId, Amount, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Fungible token selectors
pub mod token {
    pub const TRANSFER: &str = "transfer";
    pub const APPROVE: &str = "approve";
    pub const TRANSFER_FROM: &str = "transferFrom";
    pub const BALANCE_OF: &str = "balanceOf";
}

/// NFT collection selectors
pub mod nft {
    pub const TRANSFER_FROM: &str = "transferFrom";
    pub const APPROVE: &str = "approve";
    pub const OWNER_OF: &str = "ownerOf";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferArgs {
    pub to: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveArgs {
    pub spender: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFromArgs {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceOfArgs {
    pub account: AccountId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftTransferArgs {
    pub from: AccountId,
    pub to: AccountId,
    pub token_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftApproveArgs {
    pub to: AccountId,
    pub token_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerOfArgs {
    pub token_id: u64,
}

pub fn encode<T: Serialize>(args: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(args)?)
}

pub fn decode<T: DeserializeOwned>(params: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(params)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_common::ErrorKind;

    #[test]
    fn test_decode_wrong_shape() {
        let bytes = encode(&OwnerOfArgs { token_id: 3 }).unwrap();
        let err = decode::<TransferArgs>(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }
}
