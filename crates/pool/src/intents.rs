//! Payloads members sign so a relayer can act for them

use coffer_common::{AccountId, Amount};
use coffer_crypto::{CanonicalEncoder, Hash, IntentPayload};
use coffer_governance::{ProposalDraft, VoteChoice};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistIntent {
    pub invitee: AccountId,
}

impl IntentPayload for WhitelistIntent {
    const KIND: &'static str = "addToWhitelist";
    const NONCE_BOUND: bool = false;

    fn encode(&self, encoder: &mut CanonicalEncoder) {
        encoder.put_account(&self.invitee);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretIntent {
    pub hash: Hash,
    pub uses: u32,
}

impl IntentPayload for SecretIntent {
    const KIND: &'static str = "addToWhitelistWithSecret";
    const NONCE_BOUND: bool = false;

    fn encode(&self, encoder: &mut CanonicalEncoder) {
        encoder.put_bytes(self.hash.as_bytes()).put_u64(self.uses as u64);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinIntent {
    pub stake: Amount,
    /// Invite secret when joining without a whitelist entry
    pub secret: Option<Vec<u8>>,
}

impl IntentPayload for JoinIntent {
    const KIND: &'static str = "join";
    const NONCE_BOUND: bool = true;

    fn encode(&self, encoder: &mut CanonicalEncoder) {
        encoder.put_amount(self.stake).put_opt_bytes(self.secret.as_deref());
    }
}

/// A proposal signed for a specific id; once that id is taken the
/// signature is useless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalIntent {
    pub draft: ProposalDraft,
    pub proposal_id: u64,
}

impl IntentPayload for ProposalIntent {
    const KIND: &'static str = "createProposal";
    const NONCE_BOUND: bool = false;

    fn encode(&self, encoder: &mut CanonicalEncoder) {
        let draft = &self.draft;
        encoder.put_str(&draft.title).put_str(&draft.description);
        encoder.put_u64(draft.targets.len() as u64);
        for target in &draft.targets {
            encoder.put_account(target);
        }
        encoder.put_u64(draft.selectors.len() as u64);
        for selector in &draft.selectors {
            encoder.put_str(selector);
        }
        encoder.put_u64(draft.params.len() as u64);
        for params in &draft.params {
            encoder.put_bytes(params);
        }
        encoder.put_u64(draft.values.len() as u64);
        for value in &draft.values {
            encoder.put_amount(*value);
        }
        encoder.put_u64(self.proposal_id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteIntent {
    pub proposal_id: u64,
    pub choice: VoteChoice,
}

impl IntentPayload for VoteIntent {
    const KIND: &'static str = "vote";
    const NONCE_BOUND: bool = false;

    fn encode(&self, encoder: &mut CanonicalEncoder) {
        encoder.put_u64(self.proposal_id).put_u64(self.choice.as_u8() as u64);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashoutIntent;

impl IntentPayload for CashoutIntent {
    const KIND: &'static str = "cashout";
    const NONCE_BOUND: bool = true;

    fn encode(&self, _encoder: &mut CanonicalEncoder) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateIntent {
    pub delegate: AccountId,
}

impl IntentPayload for DelegateIntent {
    const KIND: &'static str = "delegateVotes";
    const NONCE_BOUND: bool = true;

    fn encode(&self, encoder: &mut CanonicalEncoder) {
        encoder.put_account(&self.delegate);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeIntent;

impl IntentPayload for RevokeIntent {
    const KIND: &'static str = "revokeDelegation";
    const NONCE_BOUND: bool = true;

    fn encode(&self, _encoder: &mut CanonicalEncoder) {}
}

/// Request by an outsider to buy in for `amount` base currency in exchange
/// for `shares`, decided by a member vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequestIntent {
    pub amount: Amount,
    pub shares: Amount,
    pub title: String,
    pub description: String,
}

impl IntentPayload for JoinRequestIntent {
    const KIND: &'static str = "createJoinProposal";
    const NONCE_BOUND: bool = true;

    fn encode(&self, encoder: &mut CanonicalEncoder) {
        encoder
            .put_amount(self.amount)
            .put_amount(self.shares)
            .put_str(&self.title)
            .put_str(&self.description);
    }
}
