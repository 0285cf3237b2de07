//! Bit sequence helpers shared by the embedding schemes.
//!
//! Bits are stored one per `u8` (0 or 1), most significant bit of each byte
//! first.

use crate::config::HEADER_BITS;
use crate::error::{Error, Result};

/// Expand bytes into bits, MSB first.
pub fn bytes_to_bits(data: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(data.len() * 8);
    for byte in data {
        for shift in (0..8).rev() {
            bits.push((byte >> shift) & 1);
        }
    }
    bits
}

/// Pack bits into bytes. A trailing group shorter than 8 bits is dropped.
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | (b & 1)))
        .collect()
}

/// Encode a payload bit count as the fixed-size length header.
pub fn length_header(bit_len: usize) -> Result<Vec<u8>> {
    let len = u32::try_from(bit_len).map_err(|_| Error::InsufficientCapacity {
        needed: bit_len,
        available: u32::MAX as usize,
    })?;
    Ok((0..HEADER_BITS)
        .rev()
        .map(|shift| ((len >> shift) & 1) as u8)
        .collect())
}

/// Decode the length header from the first `HEADER_BITS` bits.
pub fn read_length(bits: &[u8]) -> Result<usize> {
    if bits.len() < HEADER_BITS {
        return Err(Error::TruncatedPayload {
            expected: HEADER_BITS,
            found: bits.len(),
        });
    }
    let len = bits[..HEADER_BITS]
        .iter()
        .fold(0u32, |acc, &b| (acc << 1) | (b & 1) as u32);
    Ok(len as usize)
}

/// Prefix the payload with its length header.
pub fn frame(payload: &[u8]) -> Result<Vec<u8>> {
    let mut framed = length_header(payload.len())?;
    framed.extend_from_slice(payload);
    Ok(framed)
}
