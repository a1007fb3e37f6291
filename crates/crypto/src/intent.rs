//! Signed intents submitted by relayers on behalf of an account.

use coffer_common::{AccountId, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::encoding::CanonicalEncoder;
use crate::hash::Hash;
use crate::keys::{verify_signature, AccountKey};

const INTENT_DOMAIN: &str = "coffer/intent/v1";

/// Replay protection carried by an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Freshness {
    /// Must equal the subject's stored nonce; advanced on success
    Nonce(u64),
    /// The payload embeds the identity of the action itself (a proposal or
    /// vote id), so the target state moves on after one use
    Embedded,
}

/// An action that can be authorized by signature
pub trait IntentPayload {
    /// Domain label that separates intent kinds
    const KIND: &'static str;

    /// Whether the intent must carry a nonce
    const NONCE_BOUND: bool;

    /// Append the ordered semantic parameters
    fn encode(&self, encoder: &mut CanonicalEncoder);
}

/// A payload signed by its subject account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedIntent<T> {
    /// Account whose action this is
    pub subject: AccountId,
    /// The action
    pub payload: T,
    /// Replay protection
    pub freshness: Freshness,
    /// ed25519 signature over [`SignedIntent::digest`]
    pub signature: Vec<u8>,
}

impl<T: IntentPayload> SignedIntent<T> {
    /// Sign `payload` for use against `pool`
    pub fn sign(key: &AccountKey, pool: &AccountId, payload: T, freshness: Freshness) -> Self {
        let subject = key.account_id();
        let digest = Self::compute_digest(pool, &subject, &payload, &freshness);
        let signature = key.sign(digest.as_bytes());
        Self {
            subject,
            payload,
            freshness,
            signature,
        }
    }

    fn compute_digest(pool: &AccountId, subject: &AccountId, payload: &T, freshness: &Freshness) -> Hash {
        let mut encoder = CanonicalEncoder::new(INTENT_DOMAIN);
        encoder.put_str(T::KIND).put_account(pool).put_account(subject);
        payload.encode(&mut encoder);
        match freshness {
            Freshness::Nonce(n) => {
                encoder.put_bool(true).put_u64(*n);
            }
            Freshness::Embedded => {
                encoder.put_bool(false);
            }
        }
        encoder.digest()
    }

    /// Digest the subject signed, bound to `pool`
    pub fn digest(&self, pool: &AccountId) -> Hash {
        Self::compute_digest(pool, &self.subject, &self.payload, &self.freshness)
    }

    /// The nonce carried by a nonce-bound intent
    pub fn nonce(&self) -> Option<u64> {
        match self.freshness {
            Freshness::Nonce(n) => Some(n),
            Freshness::Embedded => None,
        }
    }

    /// Verify the signature binds the subject to this action on `pool`.
    ///
    /// Nonce checking is left to the caller, who owns the nonce registry.
    pub fn verify(&self, pool: &AccountId) -> Result<()> {
        if T::NONCE_BOUND != self.nonce().is_some() {
            return Err(Error::authorization(format!(
                "Intent {} has wrong freshness kind",
                T::KIND
            )));
        }
        let digest = self.digest(pool);
        verify_signature(&self.subject, digest.as_bytes(), &self.signature).map_err(|e| {
            debug!("Rejected {} intent from {}: {}", T::KIND, self.subject, e);
            Error::authorization(format!("Invalid signature: {}", e))
        })
    }
}
