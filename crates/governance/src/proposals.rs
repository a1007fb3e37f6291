//! Proposal data types

use std::collections::BTreeMap;

use coffer_common::{AccountId, Amount, Error, Result, Timestamp};
use serde::{Deserialize, Serialize};

use crate::voting::WeightSnapshot;

/// One external call in a proposal bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Account the call is made to
    pub target: AccountId,
    /// Action selector understood by the target
    pub selector: String,
    /// Encoded arguments
    pub params: Vec<u8>,
    /// Native currency attached to the call
    pub value: Amount,
}

impl Transaction {
    pub fn new(target: AccountId, selector: &str, params: Vec<u8>) -> Self {
        Self {
            target,
            selector: selector.to_string(),
            params,
            value: 0,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

/// A vote option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    Yes,
    No,
    Abstain,
}

impl VoteChoice {
    pub fn as_u8(&self) -> u8 {
        match self {
            VoteChoice::Yes => 0,
            VoteChoice::No => 1,
            VoteChoice::Abstain => 2,
        }
    }

    pub fn from_u8(mode: u8) -> Result<Self> {
        match mode {
            0 => Ok(VoteChoice::Yes),
            1 => Ok(VoteChoice::No),
            2 => Ok(VoteChoice::Abstain),
            other => Err(Error::validation(format!("Invalid vote choice {}", other))),
        }
    }
}

/// A recorded vote with the weight it carried when cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub choice: VoteChoice,
    pub weight: Amount,
}

/// Proposal as submitted. The call list is given as parallel columns,
/// matching how relayed requests arrive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDraft {
    pub title: String,
    pub description: String,
    pub targets: Vec<AccountId>,
    pub selectors: Vec<String>,
    pub params: Vec<Vec<u8>>,
    pub values: Vec<Amount>,
}

impl ProposalDraft {
    pub fn new(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    /// Append a call to every column
    pub fn with_transaction(mut self, tx: Transaction) -> Self {
        self.targets.push(tx.target);
        self.selectors.push(tx.selector);
        self.params.push(tx.params);
        self.values.push(tx.value);
        self
    }

    /// Validate the draft and zip the columns into transactions
    pub fn into_transactions(self) -> Result<(String, String, Vec<Transaction>)> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("Missing Title"));
        }
        if self.targets.is_empty() {
            return Err(Error::validation("Missing Contract Addresses"));
        }
        let n = self.targets.len();
        if self.selectors.len() != n {
            return Err(Error::validation("Inconsistent amount of selectors"));
        }
        if self.params.len() != n {
            return Err(Error::validation("Inconsistent amount of parameters"));
        }
        if self.values.len() != n {
            return Err(Error::validation("Inconsistent amount of transaction values"));
        }

        let mut transactions = Vec::with_capacity(n);
        for (((target, selector), params), value) in self
            .targets
            .into_iter()
            .zip(self.selectors)
            .zip(self.params)
            .zip(self.values)
        {
            if target.is_zero() {
                return Err(Error::validation("Missing Contract Address"));
            }
            // An empty selector is only a plain value transfer
            if selector.is_empty() && value == 0 {
                return Err(Error::validation("Missing Function Name"));
            }
            transactions.push(Transaction {
                target,
                selector,
                params,
                value,
            });
        }
        Ok((self.title, self.description, transactions))
    }
}

/// A governance proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Sequential id starting at 0
    pub id: u64,
    pub creator: AccountId,
    pub title: String,
    pub description: String,
    /// Calls run in order on execution
    pub transactions: Vec<Transaction>,
    pub deadline: Timestamp,
    /// Sum of Yes weight
    pub yes_votes: Amount,
    /// Sum of No weight
    pub no_votes: Amount,
    /// Number of distinct Yes voters
    pub yes_voters: u32,
    pub executed: bool,
    /// Voter -> ballot; an account appears at most once
    pub voters: BTreeMap<AccountId, Ballot>,
    /// Voting weights when the proposal was created
    pub snapshot: WeightSnapshot,
}

impl Proposal {
    pub fn has_voted(&self, account: &AccountId) -> bool {
        self.voters.contains_key(account)
    }

    pub fn ballot_of(&self, account: &AccountId) -> Option<Ballot> {
        self.voters.get(account).copied()
    }

    /// Native currency the bundle attaches in total
    pub fn total_value(&self) -> Amount {
        self.transactions
            .iter()
            .fold(0, |acc: Amount, tx| acc.saturating_add(tx.value))
    }
}
