//! Hash block encoder.

use crate::encoding::hash::LinearHash;
use crate::error::Result;

/// Split `bits` into hash-sized segments and append each segment's hash.
///
/// A short final segment is written as-is; its hash is computed over the
/// segment zero-padded to full length. Output length is
/// `bits.len() + blocks * m`.
///
/// # Example
///
/// ```
/// use stego_lab::encoding::{encode_blocks, LinearHash};
///
/// let hash = LinearHash::parity(4).unwrap();
/// let encoded = encode_blocks(&[1, 0, 1, 1, 1], &hash).unwrap();
///
/// // A full block of 4 data bits + parity, then 1 data bit + parity.
/// assert_eq!(encoded, vec![1, 0, 1, 1, 1, 1, 1]);
/// ```
pub fn encode_blocks(bits: &[u8], hash: &LinearHash) -> Result<Vec<u8>> {
    let n = hash.input_bits();
    let mut encoded = Vec::with_capacity(encoded_len(bits.len(), hash));

    for chunk in bits.chunks(n) {
        let mut segment = chunk.to_vec();
        segment.resize(n, 0);
        let digest = hash.hash(&segment)?;
        encoded.extend_from_slice(chunk);
        encoded.extend_from_slice(&digest);
    }

    Ok(encoded)
}

/// Number of encoded bits for `data_bits` payload bits.
pub fn encoded_len(data_bits: usize, hash: &LinearHash) -> usize {
    let n = hash.input_bits();
    let blocks = (data_bits + n - 1) / n;
    data_bits + blocks * hash.output_bits()
}
