//! Cryptographic primitives for Coffer pools
//!
//! Relayed actions carry a [`SignedIntent`]: the subject account signs a
//! canonical digest of the action bound to one pool, and the pool verifies it
//! before anything reaches its state machine.

pub mod encoding;
pub mod hash;
pub mod intent;
pub mod keys;
pub mod nonce;

use thiserror::Error;

pub use encoding::CanonicalEncoder;
pub use hash::{sha256, Hash};
pub use intent::{Freshness, IntentPayload, SignedIntent};
pub use keys::{verify_signature, AccountKey};
pub use nonce::NonceRegistry;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Verification error: {0}")]
    VerificationError(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;

impl From<CryptoError> for coffer_common::Error {
    fn from(err: CryptoError) -> Self {
        coffer_common::Error::Authorization(err.to_string())
    }
}
