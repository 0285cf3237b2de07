//! Pixel-interpolation parity embedding.
//!
//! The carrier for pixel `(j, y)` is the parity of the interpolated value
//! `(p[y][j] + p[y][j + 1]) / 2`. Only the left pixel is adjusted, so the
//! last column of each row is never a carrier.

use crate::config::DEFAULT_KEY;
use crate::crypto::Keystream;
use crate::embed::Embedder;
use crate::encoding::{decode_blocks, encode_blocks, BlockReport, LinearHash};
use crate::error::{Error, Result};
use image::GrayImage;
use tracing::debug;

/// Interpolation embedder with keyed whitening and optional hash blocks.
#[derive(Debug, Clone)]
pub struct Interpolation {
    key: String,
    hash: Option<LinearHash>,
}

impl Default for Interpolation {
    fn default() -> Self {
        Self::new(DEFAULT_KEY)
    }
}

impl Interpolation {
    /// Create an embedder whitening its frame with `key`.
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            hash: None,
        }
    }

    /// Protect the payload with hash blocks.
    pub fn with_hash(mut self, hash: LinearHash) -> Self {
        self.hash = Some(hash);
        self
    }

    /// The configured hash, if any.
    pub fn hash(&self) -> Option<&LinearHash> {
        self.hash.as_ref()
    }

    fn without_hash(&self) -> Self {
        Self {
            key: self.key.clone(),
            hash: None,
        }
    }
}

impl Embedder for Interpolation {
    fn name(&self) -> &'static str {
        "interpolation"
    }

    fn carrier_bits(&self, cover: &GrayImage) -> usize {
        cover.width().saturating_sub(1) as usize * cover.height() as usize
    }

    fn write_carrier(&self, cover: &GrayImage, bits: &[u8]) -> Result<GrayImage> {
        let available = self.carrier_bits(cover);
        if bits.len() > available {
            return Err(Error::InsufficientCapacity {
                needed: bits.len(),
                available,
            });
        }

        let mut stego = cover.clone();
        let per_row = cover.width().saturating_sub(1) as usize;
        if per_row == 0 {
            // No carriers, and `bits` is empty after the capacity check.
            return Ok(stego);
        }
        for (y, row_bits) in bits.chunks(per_row).enumerate() {
            let y = y as u32;
            // Right to left: each right neighbour is final before its left carrier.
            for (j, &bit) in row_bits.iter().enumerate().rev() {
                let j = j as u32;
                let right = stego.get_pixel(j + 1, y).0[0];
                let pixel = stego.get_pixel(j, y).0[0];
                stego.get_pixel_mut(j, y).0[0] = fit_parity(pixel, right, bit & 1);
            }
        }

        Ok(stego)
    }

    fn read_carrier(&self, stego: &GrayImage, count: usize) -> Result<Vec<u8>> {
        let available = self.carrier_bits(stego);
        if count > available {
            return Err(Error::TruncatedPayload {
                expected: count,
                found: available,
            });
        }

        let per_row = stego.width().saturating_sub(1);
        let bits = (0..stego.height())
            .flat_map(|y| (0..per_row).map(move |j| (j, y)))
            .take(count)
            .map(|(j, y)| carrier(stego.get_pixel(j, y).0[0], stego.get_pixel(j + 1, y).0[0]))
            .collect();
        Ok(bits)
    }

    fn whiten(&self, framed: &mut [u8]) {
        Keystream::from_key(&self.key).apply(framed);
    }

    fn encode_payload(&self, bits: &[u8]) -> Result<Vec<u8>> {
        match &self.hash {
            Some(hash) => {
                let encoded = encode_blocks(bits, hash)?;
                debug!(
                    data_bits = bits.len(),
                    encoded_bits = encoded.len(),
                    "Added hash blocks"
                );
                Ok(encoded)
            }
            None => Ok(bits.to_vec()),
        }
    }

    fn decode_payload(&self, bits: Vec<u8>) -> Result<Vec<u8>> {
        match &self.hash {
            Some(hash) => Ok(decode_blocks(&bits, hash)?.data),
            None => Ok(bits),
        }
    }

    fn extract_checked(&self, stego: &GrayImage) -> Result<BlockReport> {
        let raw = self.without_hash().extract_bits(stego)?;
        match &self.hash {
            Some(hash) => decode_blocks(&raw, hash),
            None => Ok(BlockReport::intact(raw)),
        }
    }
}

fn carrier(pixel: u8, right: u8) -> u8 {
    (((pixel as u16 + right as u16) / 2) & 1) as u8
}

/// Smallest in-range change to `pixel` giving the wanted carrier bit.
fn fit_parity(pixel: u8, right: u8, bit: u8) -> u8 {
    if carrier(pixel, right) == bit {
        return pixel;
    }
    for delta in [1i16, -1, 2, -2] {
        let candidate = pixel as i16 + delta;
        if (0..=255).contains(&candidate) && carrier(candidate as u8, right) == bit {
            return candidate as u8;
        }
    }
    // +2 and -2 cannot both leave the range, and one of them always flips the
    // interpolated value's parity.
    pixel
}
