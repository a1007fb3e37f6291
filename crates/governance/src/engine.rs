//! Proposal state machine
//!
//! Open -> Executed is the only stored transition. A proposal whose deadline
//! passed without enough support simply never satisfies the verdict again.

use std::collections::BTreeMap;

use coffer_common::{AccountId, Amount, Error, Result, Timestamp};
use tracing::{debug, info, warn};

use crate::execution::Executor;
use crate::proposals::{Ballot, Proposal, Transaction, VoteChoice};
use crate::voting::{Tally, VotingRules, WeightSnapshot};

#[derive(Debug, Clone, Default)]
pub struct ProposalEngine {
    /// Indexed by id
    proposals: Vec<Proposal>,
    /// Ids not yet executed, in creation order
    open_ids: Vec<u64>,
}

impl ProposalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next proposal will get
    pub fn next_id(&self) -> u64 {
        self.proposals.len() as u64
    }

    /// Record a new proposal. Ballots are weighed against `snapshot`; with
    /// `creator_votes` the creator's Yes is cast with their snapshot weight
    /// right away.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        creator: AccountId,
        title: String,
        description: String,
        transactions: Vec<Transaction>,
        deadline: Timestamp,
        now: Timestamp,
        snapshot: WeightSnapshot,
        creator_votes: bool,
    ) -> Result<u64> {
        if title.trim().is_empty() {
            return Err(Error::validation("Missing Title"));
        }
        if transactions.is_empty() {
            return Err(Error::validation("Missing Contract Addresses"));
        }
        if deadline <= now {
            return Err(Error::validation("Deadline must be in the future"));
        }

        let id = self.next_id();
        let mut proposal = Proposal {
            id,
            creator,
            title,
            description,
            transactions,
            deadline,
            yes_votes: 0,
            no_votes: 0,
            yes_voters: 0,
            executed: false,
            voters: BTreeMap::new(),
            snapshot,
        };
        let creator_weight = proposal.snapshot.weight_of(&creator);
        if creator_votes && creator_weight > 0 {
            record_ballot(&mut proposal, creator, VoteChoice::Yes, creator_weight);
        }
        info!(
            "Proposal {} '{}' created by {} ({} transactions, deadline {})",
            id,
            proposal.title,
            creator,
            proposal.transactions.len(),
            deadline
        );
        self.proposals.push(proposal);
        self.open_ids.push(id);
        Ok(id)
    }

    /// Cast a vote. `current_weight` is the voter's weight right now; the
    /// ballot carries at most what the voter held when the proposal was
    /// created and is fixed from then on.
    pub fn vote(
        &mut self,
        voter: AccountId,
        id: u64,
        choice: VoteChoice,
        current_weight: Amount,
        now: Timestamp,
    ) -> Result<()> {
        let proposal = self.proposal_mut(id)?;
        if proposal.executed {
            return Err(Error::state("Proposal already executed"));
        }
        if now >= proposal.deadline {
            return Err(Error::state("Voting period has ended"));
        }
        if proposal.has_voted(&voter) {
            return Err(Error::state("Member has voted"));
        }
        let weight = proposal.snapshot.ballot_weight(&voter, current_weight);
        if weight == 0 {
            return Err(Error::membership("No voting weight on this proposal"));
        }
        record_ballot(proposal, voter, choice, weight);
        debug!("{} voted {:?} with weight {} on proposal {}", voter, choice, weight, id);
        Ok(())
    }

    /// Check whether proposal `id` may execute now, without executing it
    pub fn check_executable(&self, id: u64, rules: &VotingRules, now: Timestamp) -> Result<()> {
        let proposal = self.get_proposal(id)?;
        if proposal.executed {
            return Err(Error::state("Proposal already executed"));
        }
        let tally = Tally {
            yes: proposal.yes_votes,
            no: proposal.no_votes,
            yes_voters: proposal.yes_voters,
            total_weight: proposal.snapshot.total(),
        };
        rules.check(&tally, proposal.deadline, now)
    }

    /// Run every transaction of proposal `id` as `origin`.
    ///
    /// The proposal is only marked executed once all calls succeeded; the
    /// executor is responsible for undoing earlier calls when a later one
    /// fails. Returns each call's return data in order.
    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        &mut self,
        id: u64,
        origin: &AccountId,
        rules: &VotingRules,
        now: Timestamp,
        available_value: Amount,
        executor: &mut dyn Executor,
    ) -> Result<Vec<Vec<u8>>> {
        self.check_executable(id, rules, now)?;
        let proposal = self.get_proposal(id)?;
        if proposal.total_value() > available_value {
            return Err(Error::economic("Pool does not have enough funds"));
        }

        let transactions = proposal.transactions.clone();
        let mut results = Vec::with_capacity(transactions.len());
        for (index, tx) in transactions.iter().enumerate() {
            match executor.execute(origin, tx) {
                Ok(data) => results.push(data),
                Err(e) => {
                    warn!("Proposal {} transaction {} ({}) failed: {}", id, index, tx.selector, e);
                    return Err(e);
                }
            }
        }

        let proposal = self.proposal_mut(id)?;
        proposal.executed = true;
        self.open_ids.retain(|open| *open != id);
        info!("Proposal {} executed", id);
        Ok(results)
    }

    pub fn get_proposal(&self, id: u64) -> Result<&Proposal> {
        self.proposals
            .get(id as usize)
            .ok_or_else(|| Error::validation("Proposal does not exist"))
    }

    fn proposal_mut(&mut self, id: u64) -> Result<&mut Proposal> {
        self.proposals
            .get_mut(id as usize)
            .ok_or_else(|| Error::validation("Proposal does not exist"))
    }

    pub fn get_transaction(&self, id: u64, index: usize) -> Result<&Transaction> {
        self.get_proposal(id)?
            .transactions
            .get(index)
            .ok_or_else(|| Error::validation("Transaction does not exist"))
    }

    pub fn all_proposal_ids(&self) -> Vec<u64> {
        (0..self.next_id()).collect()
    }

    pub fn open_proposal_ids(&self) -> &[u64] {
        &self.open_ids
    }

    pub fn has_voted(&self, id: u64, account: &AccountId) -> Result<bool> {
        Ok(self.get_proposal(id)?.has_voted(account))
    }
}

fn record_ballot(proposal: &mut Proposal, voter: AccountId, choice: VoteChoice, weight: Amount) {
    match choice {
        VoteChoice::Yes => {
            proposal.yes_votes += weight;
            proposal.yes_voters += 1;
        }
        VoteChoice::No => proposal.no_votes += weight,
        VoteChoice::Abstain => {}
    }
    proposal.voters.insert(voter, Ballot { choice, weight });
}
