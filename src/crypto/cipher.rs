//! XOR keystream over bit sequences.

use crate::crypto::kdf::{KeyDerivation, SEED_LENGTH};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Bit keystream backed by ChaCha8 seeded from a derived key.
pub struct Keystream {
    rng: ChaCha8Rng,
}

impl Keystream {
    /// Create a keystream from a raw seed.
    pub fn new(seed: [u8; SEED_LENGTH]) -> Self {
        Self {
            rng: ChaCha8Rng::from_seed(seed),
        }
    }

    /// Create a keystream from a text key.
    pub fn from_key(key: &str) -> Self {
        Self::new(*KeyDerivation::from_key(key).seed())
    }

    /// Next keystream bit.
    pub fn next_bit(&mut self) -> u8 {
        self.rng.gen::<bool>() as u8
    }

    /// XOR every bit in place with the next keystream bit.
    pub fn apply(&mut self, bits: &mut [u8]) {
        for bit in bits.iter_mut() {
            *bit = (*bit ^ self.next_bit()) & 1;
        }
    }
}

/// Whiten (or un-whiten) a bit sequence with a fresh keystream for `key`.
///
/// The operation is an involution: calling it twice with the same key
/// returns the input.
pub fn whiten(bits: &[u8], key: &str) -> Vec<u8> {
    let mut out = bits.to_vec();
    Keystream::from_key(key).apply(&mut out);
    out
}
