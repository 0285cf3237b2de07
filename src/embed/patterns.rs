//! High-bit pattern flags.
//!
//! Nothing in the high bits changes. Each pixel exposes three overlapping
//! two-bit windows (bits 7-6, 6-5, 5-4); when a window equals the next
//! message symbol the matching flag (bit 2, 1 or 0) is set. The achievable
//! capacity depends on both the cover and the message.

use crate::embed::Embedder;
use crate::error::{Error, Result};
use image::GrayImage;

/// Flag bit for each window, in matching order.
const WINDOWS: [(u8, u8); 3] = [(6, 2), (5, 1), (4, 0)];

/// Pattern-flag embedder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternFlags;

impl PatternFlags {
    /// Create the embedder.
    pub fn new() -> Self {
        Self
    }

    /// How many bits of `bits` the cover can carry, counted in whole symbols.
    pub fn capacity_for(&self, cover: &GrayImage, bits: &[u8]) -> usize {
        let symbols = to_symbols(bits);
        let mut placed = 0;
        for (x, y) in column_major(cover) {
            if placed == symbols.len() {
                break;
            }
            let (_, matched) = flag_pixel(cover.get_pixel(x, y).0[0], &symbols[placed..]);
            placed += matched;
        }
        (placed * 2).min(bits.len())
    }
}

impl Embedder for PatternFlags {
    fn name(&self) -> &'static str {
        "patterns"
    }

    fn carrier_bits(&self, cover: &GrayImage) -> usize {
        cover.width() as usize * cover.height() as usize * WINDOWS.len() * 2
    }

    fn write_carrier(&self, cover: &GrayImage, bits: &[u8]) -> Result<GrayImage> {
        let symbols = to_symbols(bits);
        let mut stego = cover.clone();
        let mut placed = 0;

        for (x, y) in column_major(cover) {
            if placed == symbols.len() {
                break;
            }
            let pixel = stego.get_pixel_mut(x, y);
            let (value, matched) = flag_pixel(pixel.0[0], &symbols[placed..]);
            pixel.0[0] = value;
            placed += matched;
        }

        if placed < symbols.len() {
            return Err(Error::InsufficientCapacity {
                needed: bits.len(),
                available: placed * 2,
            });
        }
        Ok(stego)
    }

    fn read_carrier(&self, stego: &GrayImage, count: usize) -> Result<Vec<u8>> {
        let mut bits = Vec::with_capacity(count + 1);

        'pixels: for (x, y) in column_major(stego) {
            let value = stego.get_pixel(x, y).0[0];
            for (shift, flag) in WINDOWS {
                if bits.len() >= count {
                    break 'pixels;
                }
                if value >> flag & 1 == 1 {
                    let window = value >> shift & 0b11;
                    bits.push(window >> 1);
                    bits.push(window & 1);
                }
            }
        }

        if bits.len() < count {
            return Err(Error::TruncatedPayload {
                expected: count,
                found: bits.len(),
            });
        }
        bits.truncate(count);
        Ok(bits)
    }
}

/// Pack bits into 2-bit symbols, zero-padding an odd tail.
fn to_symbols(bits: &[u8]) -> Vec<u8> {
    bits.chunks(2)
        .map(|pair| (pair[0] & 1) << 1 | pair.get(1).copied().unwrap_or(0) & 1)
        .collect()
}

/// Set or clear the three flags of one pixel against the pending symbols.
/// Returns the new value and how many symbols were matched.
fn flag_pixel(value: u8, pending: &[u8]) -> (u8, usize) {
    let mut value = value;
    let mut matched = 0;
    for (shift, flag) in WINDOWS {
        let window = value >> shift & 0b11;
        if pending.get(matched) == Some(&window) {
            value |= 1 << flag;
            matched += 1;
        } else {
            value &= !(1 << flag);
        }
    }
    (value, matched)
}

fn column_major(img: &GrayImage) -> impl Iterator<Item = (u32, u32)> {
    let (width, height) = img.dimensions();
    (0..width).flat_map(move |x| (0..height).map(move |y| (x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::test_support::cover;
    use image::Luma;

    #[test]
    fn test_flag_pixel() {
        // 0b1011_0xxx: windows 10, 01, 11.
        let (value, matched) = flag_pixel(0b1011_0000, &[0b10, 0b01, 0b11]);
        assert_eq!(value, 0b1011_0111);
        assert_eq!(matched, 3);

        let (value, matched) = flag_pixel(0b1011_0111, &[0b01]);
        assert_eq!(value, 0b1011_0010);
        assert_eq!(matched, 1);

        let (value, matched) = flag_pixel(0b1011_0101, &[]);
        assert_eq!(value, 0b1011_0000);
        assert_eq!(matched, 0);
    }

    #[test]
    fn test_high_bits_untouched() {
        let cover = cover(32, 32);
        let stego = PatternFlags::new().embed(&cover, b"flags").unwrap();
        for (a, b) in cover.pixels().zip(stego.pixels()) {
            assert_eq!(a.0[0] & 0xF8, b.0[0] & 0xF8);
        }
    }

    #[test]
    fn test_roundtrip() {
        let cover = GrayImage::from_fn(32, 32, |x, y| Luma([(x * 8 + y * 3) as u8]));
        let scheme = PatternFlags::new();
        let message = b"pattern";

        let stego = scheme.embed(&cover, message).unwrap();
        assert_eq!(scheme.extract(&stego).unwrap(), message);
    }

    #[test]
    fn test_odd_bit_count() {
        let cover = GrayImage::from_fn(16, 16, |x, y| Luma([(x * 16 + y) as u8]));
        let scheme = PatternFlags::new();
        let bits = vec![1, 1, 0, 1, 0];

        let stego = scheme.embed_bits(&cover, &bits).unwrap();
        assert_eq!(scheme.extract_bits(&stego).unwrap(), bits);
    }

    #[test]
    fn test_capacity_for_uniform_cover() {
        // Every window of 0 is 00: only all-zero symbols ever match.
        let cover = GrayImage::from_pixel(4, 4, Luma([0]));
        let scheme = PatternFlags::new();

        assert_eq!(scheme.capacity_for(&cover, &[0; 40]), 40);
        assert_eq!(scheme.capacity_for(&cover, &[1, 1, 0, 0]), 0);
        assert_eq!(scheme.carrier_bits(&cover), 96);
    }

    #[test]
    fn test_insufficient_capacity() {
        let cover = GrayImage::from_pixel(4, 4, Luma([0]));
        let result = PatternFlags::new().embed(&cover, &[0xFF]);
        assert!(matches!(result, Err(Error::InsufficientCapacity { .. })));
    }
}
