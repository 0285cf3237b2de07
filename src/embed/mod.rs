//! Image embedding schemes.
//!
//! Every scheme writes a 32-bit payload length header followed by the
//! payload bits into its own carrier positions. The [`Embedder`] trait holds
//! the shared framing; schemes only describe how carrier bits are written and
//! read.
//!
//! # Example
//!
//! ```
//! use image::{GrayImage, Luma};
//! use stego_lab::embed::{Embedder, LsbMatchingRevisited};
//!
//! let cover = GrayImage::from_fn(64, 64, |x, y| Luma([((x * 3 + y * 5) % 256) as u8]));
//! let scheme = LsbMatchingRevisited::new();
//!
//! let stego = scheme.embed(&cover, b"hidden").unwrap();
//! assert_eq!(scheme.extract(&stego).unwrap(), b"hidden");
//! ```

mod interpolation;
mod lsbmr;
mod patterns;

pub use interpolation::Interpolation;
pub use lsbmr::LsbMatchingRevisited;
pub use patterns::PatternFlags;

use crate::bits::{bits_to_bytes, bytes_to_bits, frame, read_length};
use crate::config::HEADER_BITS;
use crate::encoding::BlockReport;
use crate::error::{Error, Result};
use crate::imaging::psnr;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// An image steganography scheme.
pub trait Embedder {
    /// Short scheme name for logs and reports.
    fn name(&self) -> &'static str;

    /// Carrier bits available in `cover`, header included.
    fn carrier_bits(&self, cover: &GrayImage) -> usize;

    /// Write raw carrier bits into a copy of `cover`.
    fn write_carrier(&self, cover: &GrayImage, bits: &[u8]) -> Result<GrayImage>;

    /// Read the first `count` raw carrier bits.
    fn read_carrier(&self, stego: &GrayImage, count: usize) -> Result<Vec<u8>>;

    /// Transform applied to the framed bits before writing and after reading.
    /// Must be its own inverse.
    fn whiten(&self, _framed: &mut [u8]) {}

    /// Transform payload bits before framing.
    fn encode_payload(&self, bits: &[u8]) -> Result<Vec<u8>> {
        Ok(bits.to_vec())
    }

    /// Inverse of [`Embedder::encode_payload`].
    fn decode_payload(&self, bits: Vec<u8>) -> Result<Vec<u8>> {
        Ok(bits)
    }

    /// Payload bits that fit after the header.
    fn capacity_bits(&self, cover: &GrayImage) -> usize {
        self.carrier_bits(cover).saturating_sub(HEADER_BITS)
    }

    /// Embed payload bits.
    fn embed_bits(&self, cover: &GrayImage, payload: &[u8]) -> Result<GrayImage> {
        let encoded = self.encode_payload(payload)?;
        let mut framed = frame(&encoded)?;

        let available = self.carrier_bits(cover);
        if framed.len() > available {
            return Err(Error::InsufficientCapacity {
                needed: framed.len(),
                available,
            });
        }

        self.whiten(&mut framed);
        debug!(scheme = self.name(), bits = framed.len(), available, "Embedding frame");
        self.write_carrier(cover, &framed)
    }

    /// Extract payload bits.
    fn extract_bits(&self, stego: &GrayImage) -> Result<Vec<u8>> {
        let available = self.carrier_bits(stego);

        let mut header = self.read_carrier(stego, HEADER_BITS)?;
        self.whiten(&mut header);
        let len = read_length(&header)?;

        if HEADER_BITS + len > available {
            return Err(Error::TruncatedPayload {
                expected: len,
                found: available.saturating_sub(HEADER_BITS),
            });
        }

        let mut framed = self.read_carrier(stego, HEADER_BITS + len)?;
        self.whiten(&mut framed);
        framed.drain(..HEADER_BITS);
        debug!(scheme = self.name(), bits = len, "Extracted frame");

        self.decode_payload(framed)
    }

    /// Extract payload bits together with the hash block outcome.
    ///
    /// Schemes without hash blocks report the payload as one intact block.
    fn extract_checked(&self, stego: &GrayImage) -> Result<BlockReport> {
        self.extract_bits(stego).map(BlockReport::intact)
    }

    /// Embed a byte payload.
    fn embed(&self, cover: &GrayImage, payload: &[u8]) -> Result<GrayImage> {
        self.embed_bits(cover, &bytes_to_bits(payload))
    }

    /// Extract a byte payload.
    fn extract(&self, stego: &GrayImage) -> Result<Vec<u8>> {
        Ok(bits_to_bytes(&self.extract_bits(stego)?))
    }
}

/// Available embedding schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scheme {
    /// LSB matching revisited.
    Lsbmr,
    /// Pixel-interpolation parity embedding.
    Interpolation,
    /// High-bit pattern flags.
    Patterns,
}

impl Scheme {
    /// All schemes, in display order.
    pub const ALL: [Scheme; 3] = [Scheme::Lsbmr, Scheme::Interpolation, Scheme::Patterns];
}

/// Summary of one embedding run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedReport {
    /// Scheme name.
    pub scheme: String,
    /// Payload size in bits (before any hash blocks).
    pub payload_bits: usize,
    /// Payload capacity of the cover in bits.
    pub capacity_bits: usize,
    /// Share of the capacity used, in percent.
    pub utilisation: f64,
    /// PSNR between cover and stego image, in dB.
    pub psnr: f64,
}

/// Embed `payload` and measure the result.
pub fn embed_with_report<E: Embedder + ?Sized>(
    scheme: &E,
    cover: &GrayImage,
    payload: &[u8],
) -> Result<(GrayImage, EmbedReport)> {
    let stego = scheme.embed(cover, payload)?;
    let payload_bits = payload.len() * 8;
    let capacity_bits = scheme.capacity_bits(cover);
    let utilisation = if capacity_bits == 0 {
        0.0
    } else {
        payload_bits as f64 / capacity_bits as f64 * 100.0
    };

    let report = EmbedReport {
        scheme: scheme.name().to_string(),
        payload_bits,
        capacity_bits,
        utilisation,
        psnr: psnr(cover, &stego)?,
    };

    info!(
        scheme = %report.scheme,
        payload_bits,
        capacity_bits,
        psnr = report.psnr,
        "Payload embedded"
    );

    Ok((stego, report))
}
