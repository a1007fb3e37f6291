//! Pro-rata payout arithmetic

use coffer_common::{AccountId, Amount, Result};
use coffer_ledger::mul_div;
use serde::{Deserialize, Serialize};

/// What a payout moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutAsset {
    Native,
    Token(AccountId),
    Nft { collection: AccountId, id: u64 },
}

/// One transfer made by a distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub recipient: AccountId,
    pub asset: PayoutAsset,
    /// Always 1 for NFTs
    pub amount: Amount,
}

/// Split `amount` across `holders` by weight, rounding each share down.
///
/// The remainder is not assigned; zero shares are skipped. Fails when a
/// product overflows rather than paying out less.
pub fn pro_rata(
    amount: Amount,
    holders: &[(AccountId, Amount)],
    total_weight: Amount,
) -> Result<Vec<(AccountId, Amount)>> {
    if total_weight == 0 || amount == 0 {
        return Ok(Vec::new());
    }
    let mut shares = Vec::with_capacity(holders.len());
    for (account, weight) in holders {
        let share = mul_div(amount, *weight, total_weight)?;
        if share > 0 {
            shares.push((*account, share));
        }
    }
    Ok(shares)
}
