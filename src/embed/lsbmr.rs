//! LSB matching revisited.
//!
//! Pixels are paired horizontally within each row. Each pair `(x1, x2)`
//! carries two bits: the LSB of `x1` and `f(x1, x2) = LSB(x1 / 2 + x2)`.
//! At most one pixel of a pair changes, by ±1.

use crate::bits::{bytes_to_bits, frame};
use crate::embed::Embedder;
use crate::error::{Error, Result};
use image::GrayImage;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// LSB matching revisited embedder.
#[derive(Debug, Clone, Default)]
pub struct LsbMatchingRevisited {
    seed: Option<u64>,
}

impl LsbMatchingRevisited {
    /// Embedder drawing its ±1 directions from OS entropy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Embedder with reproducible ±1 directions.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    /// Embed a byte payload using the supplied randomness.
    pub fn embed_with_rng<R: Rng + ?Sized>(
        &self,
        cover: &GrayImage,
        payload: &[u8],
        rng: &mut R,
    ) -> Result<GrayImage> {
        let framed = frame(&bytes_to_bits(payload))?;
        let available = self.carrier_bits(cover);
        if framed.len() > available {
            return Err(Error::InsufficientCapacity {
                needed: framed.len(),
                available,
            });
        }
        Ok(write_pairs(cover, &framed, rng))
    }
}

impl Embedder for LsbMatchingRevisited {
    fn name(&self) -> &'static str {
        "lsbmr"
    }

    fn carrier_bits(&self, cover: &GrayImage) -> usize {
        pair_count(cover) * 2
    }

    fn write_carrier(&self, cover: &GrayImage, bits: &[u8]) -> Result<GrayImage> {
        if bits.len() > self.carrier_bits(cover) {
            return Err(Error::InsufficientCapacity {
                needed: bits.len(),
                available: self.carrier_bits(cover),
            });
        }
        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(write_pairs(cover, bits, &mut rng))
    }

    fn read_carrier(&self, stego: &GrayImage, count: usize) -> Result<Vec<u8>> {
        if count > self.carrier_bits(stego) {
            return Err(Error::TruncatedPayload {
                expected: count,
                found: self.carrier_bits(stego),
            });
        }

        let mut bits = Vec::with_capacity(count + 1);
        for (x, y) in pair_positions(stego).take((count + 1) / 2) {
            let x1 = stego.get_pixel(x, y).0[0];
            let x2 = stego.get_pixel(x + 1, y).0[0];
            bits.push(x1 & 1);
            bits.push(f(x1, x2));
        }
        bits.truncate(count);
        Ok(bits)
    }
}

/// Second carrier bit of a pair.
fn f(a: u8, b: u8) -> u8 {
    (((a >> 1) as u16 + b as u16) & 1) as u8
}

fn pair_count(img: &GrayImage) -> usize {
    (img.width() / 2) as usize * img.height() as usize
}

fn pair_positions(img: &GrayImage) -> impl Iterator<Item = (u32, u32)> {
    let (width, height) = img.dimensions();
    (0..height).flat_map(move |y| (0..width / 2).map(move |k| (2 * k, y)))
}

/// Move a pixel by one step in a random direction, inward at the range ends.
fn nudge<R: Rng + ?Sized>(value: u8, rng: &mut R) -> u8 {
    match value {
        0 => 1,
        255 => 254,
        v if rng.gen::<bool>() => v + 1,
        v => v - 1,
    }
}

fn write_pairs<R: Rng + ?Sized>(cover: &GrayImage, bits: &[u8], rng: &mut R) -> GrayImage {
    let mut stego = cover.clone();

    for ((x, y), pair) in pair_positions(cover).zip(bits.chunks(2)) {
        let m1 = pair[0] & 1;
        let m2 = pair.get(1).copied().unwrap_or(0) & 1;
        let mut x1 = stego.get_pixel(x, y).0[0];
        let mut x2 = stego.get_pixel(x + 1, y).0[0];

        if x1 & 1 == m1 {
            if f(x1, x2) != m2 {
                x2 = nudge(x2, rng);
            }
        } else {
            x1 = match x1 {
                0 => 1,
                255 => 254,
                v if f(v - 1, x2) == m2 => v - 1,
                v => v + 1,
            };
            // Only reachable at the range ends.
            if f(x1, x2) != m2 {
                x2 = nudge(x2, rng);
            }
        }

        stego.get_pixel_mut(x, y).0[0] = x1;
        stego.get_pixel_mut(x + 1, y).0[0] = x2;
    }

    stego
}
