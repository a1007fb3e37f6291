//! NFT lottery.
//!
//! NFTs cannot be split, so liquidation hands each one to a holder drawn
//! with probability proportional to their share balance. The draw is driven
//! by a 32-byte seed from a [`SeedSource`].

use coffer_common::{AccountId, Amount, Error, Result};
use coffer_crypto::{sha256, CanonicalEncoder, Hash};
use rand::{rngs::OsRng, rngs::StdRng, Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// Source of lottery seeds
pub trait SeedSource: Send + Sync {
    /// Seed for a draw; `context` binds it to the pool and draw
    fn seed(&mut self, context: &[u8]) -> Result<[u8; 32]>;
}

/// Seeds from the operating system's CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSeedSource;

impl SeedSource for OsSeedSource {
    fn seed(&mut self, _context: &[u8]) -> Result<[u8; 32]> {
        let mut seed = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| Error::internal(format!("OS random source failed: {}", e)))?;
        Ok(seed)
    }
}

/// Always returns the same seed
#[derive(Debug, Clone, Copy)]
pub struct FixedSeed(pub [u8; 32]);

impl SeedSource for FixedSeed {
    fn seed(&mut self, _context: &[u8]) -> Result<[u8; 32]> {
        Ok(self.0)
    }
}

/// Commit-reveal seed: a party commits to `sha256(secret)` ahead of time and
/// reveals the secret before the draw. The seed is `H(secret || context)`.
#[derive(Debug, Clone)]
pub struct CommitRevealSeed {
    commitment: Hash,
    revealed: Option<Vec<u8>>,
}

impl CommitRevealSeed {
    pub fn commit(commitment: Hash) -> Self {
        Self {
            commitment,
            revealed: None,
        }
    }

    pub fn reveal(&mut self, secret: &[u8]) -> Result<()> {
        if sha256(secret) != self.commitment {
            return Err(Error::authorization("Revealed secret does not match commitment"));
        }
        self.revealed = Some(secret.to_vec());
        Ok(())
    }
}

impl SeedSource for CommitRevealSeed {
    fn seed(&mut self, context: &[u8]) -> Result<[u8; 32]> {
        let secret = self
            .revealed
            .as_ref()
            .ok_or_else(|| Error::state("Seed secret not revealed"))?;
        let mut encoder = CanonicalEncoder::new("coffer/lottery-seed");
        encoder.put_bytes(secret).put_bytes(context);
        Ok(*encoder.digest().as_bytes())
    }
}

/// One NFT handed out by the lottery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftAward {
    pub collection: AccountId,
    pub id: u64,
    pub recipient: AccountId,
}

/// Draw a recipient for every NFT, weighted by `holders`' balances
pub fn allocate_nfts(
    nfts: &[(AccountId, u64)],
    holders: &[(AccountId, Amount)],
    seed: [u8; 32],
) -> Vec<NftAward> {
    let total: Amount = holders.iter().map(|(_, weight)| *weight).sum();
    if total == 0 {
        return Vec::new();
    }
    let mut rng = StdRng::from_seed(seed);
    nfts.iter()
        .filter_map(|(collection, id)| {
            let mut ticket = rng.gen_range(0..total);
            holders.iter().find_map(|(account, weight)| {
                if ticket < *weight {
                    Some(NftAward {
                        collection: *collection,
                        id: *id,
                        recipient: *account,
                    })
                } else {
                    ticket -= weight;
                    None
                }
            })
        })
        .collect()
}
