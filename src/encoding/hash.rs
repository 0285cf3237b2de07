//! Linear hash functions over GF(2).

use crate::config::HashConfig;
use crate::crypto::KeyDerivation;
use crate::error::{Error, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A linear map from `input_bits` bits to `output_bits` bits.
///
/// Each output bit is the parity of the input bits selected by one row of the
/// matrix, so `hash(a ^ b) == hash(a) ^ hash(b)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearHash {
    input_bits: usize,
    output_bits: usize,
    /// Row-major `output_bits x input_bits` matrix of 0/1 entries.
    matrix: Vec<u8>,
}

impl LinearHash {
    /// Single parity bit over `n >= 1` input bits.
    pub fn parity(n: usize) -> Result<Self> {
        Self::from_matrix(n, 1, vec![1; n])
    }

    /// Random mixing matrix with `m` output bits over `n` input bits.
    pub fn mixing<R: Rng + ?Sized>(n: usize, m: usize, rng: &mut R) -> Result<Self> {
        if n < m || m < 1 {
            return Err(Error::Hash(format!(
                "mixing hash needs n >= m >= 1, got n = {}, m = {}",
                n, m
            )));
        }
        let matrix = (0..n * m).map(|_| rng.gen_range(0..=1u8)).collect();
        Ok(Self {
            input_bits: n,
            output_bits: m,
            matrix,
        })
    }

    /// Mixing matrix derived from a text key, so both sides rebuild it.
    pub fn keyed(n: usize, m: usize, key: &str) -> Result<Self> {
        let mut rng = ChaCha8Rng::from_seed(*KeyDerivation::from_key(key).seed());
        Self::mixing(n, m, &mut rng)
    }

    /// Hash described by the configuration: parity for one hash bit, a keyed
    /// mixing matrix otherwise.
    pub fn from_config(config: &HashConfig, key: &str) -> Result<Self> {
        if config.hash_bits == 1 {
            Self::parity(config.block_size)
        } else {
            Self::keyed(config.block_size, config.hash_bits, key)
        }
    }

    /// Build from an explicit matrix.
    pub fn from_matrix(input_bits: usize, output_bits: usize, matrix: Vec<u8>) -> Result<Self> {
        if input_bits < output_bits || output_bits < 1 {
            return Err(Error::Hash(format!(
                "hash needs n >= m >= 1, got n = {}, m = {}",
                input_bits, output_bits
            )));
        }
        if matrix.len() != input_bits * output_bits {
            return Err(Error::Hash(format!(
                "matrix has {} entries, expected {}",
                matrix.len(),
                input_bits * output_bits
            )));
        }
        Ok(Self {
            input_bits,
            output_bits,
            matrix: matrix.into_iter().map(|b| b & 1).collect(),
        })
    }

    /// Number of input bits per word.
    pub fn input_bits(&self) -> usize {
        self.input_bits
    }

    /// Number of hash bits per word.
    pub fn output_bits(&self) -> usize {
        self.output_bits
    }

    /// Hash one word.
    pub fn hash(&self, word: &[u8]) -> Result<Vec<u8>> {
        if word.len() != self.input_bits {
            return Err(Error::Hash(format!(
                "input word must be {} bits, got {}",
                self.input_bits,
                word.len()
            )));
        }
        Ok(self
            .matrix
            .chunks_exact(self.input_bits)
            .map(|row| {
                row.iter()
                    .zip(word)
                    .fold(0u8, |acc, (&m, &w)| acc ^ (m & w & 1))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
        a.iter().zip(b).map(|(x, y)| x ^ y).collect()
    }

    #[test]
    fn test_parity_needs_input_bits() {
        assert!(matches!(LinearHash::parity(0), Err(Error::Hash(_))));
        let config = HashConfig {
            block_size: 0,
            hash_bits: 1,
        };
        assert!(LinearHash::from_config(&config, "k").is_err());
    }

    #[test]
    fn test_parity() {
        let h = LinearHash::parity(8).unwrap();
        assert_eq!(h.hash(&[1, 0, 1, 1, 0, 0, 0, 0]).unwrap(), vec![1]);
        assert_eq!(h.hash(&[1, 1, 0, 0, 0, 0, 0, 0]).unwrap(), vec![0]);
    }

    #[test]
    fn test_mixing_is_linear() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let h = LinearHash::mixing(8, 4, &mut rng).unwrap();

        let a = [1, 0, 1, 0, 1, 0, 1, 0];
        let b = [1, 1, 0, 0, 1, 1, 0, 0];
        let lhs = h.hash(&xor(&a, &b)).unwrap();
        let rhs = xor(&h.hash(&a).unwrap(), &h.hash(&b).unwrap());

        assert_eq!(lhs.len(), 4);
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn test_mixing_rejects_bad_dimensions() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(LinearHash::mixing(4, 8, &mut rng).is_err());
        assert!(LinearHash::mixing(4, 0, &mut rng).is_err());
    }

    #[test]
    fn test_keyed_is_reproducible() {
        let a = LinearHash::keyed(16, 3, "key").unwrap();
        let b = LinearHash::keyed(16, 3, "key").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, LinearHash::keyed(16, 3, "other").unwrap());
    }

    #[test]
    fn test_from_config() {
        let parity = LinearHash::from_config(&HashConfig::default(), "k").unwrap();
        assert_eq!(parity, LinearHash::parity(8).unwrap());

        let config = HashConfig {
            block_size: 12,
            hash_bits: 4,
        };
        let mixing = LinearHash::from_config(&config, "k").unwrap();
        assert_eq!((mixing.input_bits(), mixing.output_bits()), (12, 4));
    }

    #[test]
    fn test_wrong_word_length() {
        let h = LinearHash::parity(8).unwrap();
        assert!(matches!(h.hash(&[1, 0]), Err(Error::Hash(_))));
    }

    #[test]
    fn test_from_matrix() {
        let h = LinearHash::from_matrix(3, 2, vec![1, 1, 0, 0, 1, 1]).unwrap();
        assert_eq!(h.hash(&[1, 0, 1]).unwrap(), vec![1, 1]);
        assert!(LinearHash::from_matrix(3, 2, vec![1, 0]).is_err());
    }
}
