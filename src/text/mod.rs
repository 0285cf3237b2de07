//! Text steganography in inter-word whitespace.
//!
//! # Example
//!
//! ```
//! use stego_lab::text;
//!
//! let cover = "lorem ipsum ".repeat(20);
//! let (stego, report) = text::embed(&cover, b"ok").unwrap();
//!
//! assert_eq!(report.bits_used, 24);
//! assert_eq!(text::extract(&stego), b"ok");
//! ```

mod whitespace;

pub use whitespace::{capacity, embed, extract, words};

use serde::{Deserialize, Serialize};

/// Summary of a text embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextReport {
    /// Words in the cover, one bit each.
    pub words: usize,
    /// Bits written, terminator included.
    pub bits_used: usize,
    /// Share of the words used, in percent.
    pub utilisation: f64,
}

impl TextReport {
    fn new(words: usize, bits_used: usize) -> Self {
        let utilisation = if words == 0 {
            0.0
        } else {
            bits_used as f64 / words as f64 * 100.0
        };
        Self {
            words,
            bits_used,
            utilisation,
        }
    }
}
