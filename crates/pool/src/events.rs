//! Notifications emitted by a pool.
//!
//! Events are journaled with the state they describe: a failed operation
//! rolls them back together. Field order is stable for indexers.

use coffer_common::{AccountId, Amount};
use coffer_economic::Payout;
use coffer_governance::VoteChoice;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolEvent {
    PoolLaunched {
        pool: AccountId,
        creator: AccountId,
        name: String,
    },
    Joined {
        account: AccountId,
        stake: Amount,
        shares: Amount,
    },
    Funded {
        account: AccountId,
        amount: Amount,
        shares: Amount,
    },
    Whitelisted {
        inviter: AccountId,
        invitee: AccountId,
    },
    SecretRegistered {
        inviter: AccountId,
        uses: u32,
    },
    ProposalCreated {
        id: u64,
        creator: AccountId,
        title: String,
    },
    Voted {
        id: u64,
        voter: AccountId,
        choice: VoteChoice,
    },
    ProposalExecuted {
        id: u64,
        executor: AccountId,
        return_data: Vec<Vec<u8>>,
    },
    PoolClosed,
    TokenAdded {
        token: AccountId,
        is_nft: bool,
        id: u64,
    },
    Cashout {
        account: AccountId,
        amount: Amount,
    },
    /// One recipient's share of a distribution or transfer
    Distributed(Payout),
    Liquidated,
}
