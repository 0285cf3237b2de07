//! Stego Lab
//!
//! Image and text steganography with the matching steganalysis.
//!
//! # Features
//!
//! - **Bit planes**: render any bit plane of an image for visual inspection
//! - **Embedding**: LSB matching revisited, keyed pixel-interpolation parity
//!   with optional hash blocks, and high-bit pattern flags
//! - **Steganalysis**: chi-square attack, RS analysis and the AUMP detector,
//!   run in parallel over whole directories
//! - **Text**: hide bits in the gaps between words
//!
//! # Architecture
//!
//! ```text
//! Payload → [Hash blocks] → Length header → [Whitening] → Carrier pixels
//! ```
//!
//! # Example
//!
//! ```rust
//! use image::{GrayImage, Luma};
//! use stego_lab::embed::{Embedder, Interpolation};
//! use stego_lab::encoding::LinearHash;
//!
//! let cover = GrayImage::from_fn(64, 64, |x, y| Luma([(x * 2 + y) as u8]));
//! let scheme = Interpolation::new("my key").with_hash(LinearHash::parity(8).unwrap());
//!
//! let stego = scheme.embed(&cover, b"Hidden data").unwrap();
//! let report = scheme.extract_checked(&stego).unwrap();
//! assert!(report.is_intact());
//! assert_eq!(scheme.extract(&stego).unwrap(), b"Hidden data");
//! ```

pub mod analysis;
pub mod bits;
pub mod config;
pub mod crypto;
pub mod embed;
pub mod encoding;
pub mod error;
pub mod imaging;
pub mod text;

pub use config::LabConfig;
pub use embed::{Embedder, Scheme};
pub use error::{Error, Result};
