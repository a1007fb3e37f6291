//! Governance for Coffer pools
//!
//! Members bundle ordered external calls into a [`Proposal`], vote on it
//! with their share weight, and once the voting rules allow it the bundle
//! runs through an [`Executor`] as a single all-or-nothing unit.

pub mod engine;
pub mod execution;
pub mod proposals;
pub mod voting;

pub use engine::ProposalEngine;
pub use execution::Executor;
pub use proposals::{Ballot, Proposal, ProposalDraft, Transaction, VoteChoice};
pub use voting::{Tally, VotingRules, WeightSnapshot};
