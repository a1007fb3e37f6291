//! ed25519 account keys
//!
//! An account identifier is the raw 32-byte ed25519 public key, so verifying
//! a signature against the claimed account is the same as recovering the
//! signer and comparing.

use coffer_common::AccountId;
use ed25519_dalek::{ExpandedSecretKey, PublicKey, SecretKey, Signature, Verifier};
use rand::{rngs::OsRng, RngCore};

use crate::hash::sha256;
use crate::{CryptoError, CryptoResult};

pub struct AccountKey {
    secret: SecretKey,
    public: PublicKey,
}

impl AccountKey {
    /// Generate a fresh key from the OS random source
    pub fn generate() -> CryptoResult<Self> {
        let mut seed = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| CryptoError::KeyGenerationError(e.to_string()))?;
        Self::from_secret_bytes(&seed)
    }

    /// Deterministic key derived from arbitrary seed material
    pub fn from_seed(seed: &[u8]) -> CryptoResult<Self> {
        Self::from_secret_bytes(sha256(seed).as_bytes())
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let secret = SecretKey::from_bytes(bytes)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let public = PublicKey::from(&secret);
        Ok(Self { secret, public })
    }

    pub fn account_id(&self) -> AccountId {
        AccountId::new(self.public.to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let expanded = ExpandedSecretKey::from(&self.secret);
        expanded.sign(message, &self.public).to_bytes().to_vec()
    }
}

impl std::fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountKey")
            .field("account", &self.account_id())
            .finish_non_exhaustive()
    }
}

/// Verify that `account` signed `message`
pub fn verify_signature(account: &AccountId, message: &[u8], signature: &[u8]) -> CryptoResult<()> {
    let public = PublicKey::from_bytes(account.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let signature = Signature::try_from(signature)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    public
        .verify(message, &signature)
        .map_err(|e| CryptoError::VerificationError(e.to_string()))
}
