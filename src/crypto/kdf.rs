//! Key to seed derivation for the keystream.

use sha2::{Digest, Sha256};

/// Length of the derived seed in bytes.
pub const SEED_LENGTH: usize = 32;

/// Derives a deterministic 256-bit seed from a text key.
#[derive(Debug, Clone)]
pub struct KeyDerivation {
    seed: [u8; SEED_LENGTH],
}

impl KeyDerivation {
    /// Derive the seed as SHA-256 of the key bytes.
    pub fn from_key(key: &str) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        let mut seed = [0u8; SEED_LENGTH];
        seed.copy_from_slice(&digest);
        Self { seed }
    }

    /// Get the derived seed.
    pub fn seed(&self) -> &[u8; SEED_LENGTH] {
        &self.seed
    }

    /// Short hex fingerprint of the seed, safe to log.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.seed[..4])
    }
}
