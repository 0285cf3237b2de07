//! Error types for stego-lab.

use thiserror::Error;

/// Result type alias for stego-lab operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while embedding, extracting or analysing.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Bit plane index outside 0..=7.
    #[error("Bit index must be between 0 and 7, got {0}")]
    InvalidBitIndex(u8),

    /// Payload does not fit into the cover.
    #[error("Not enough capacity: need {needed} bits, have {available} bits")]
    InsufficientCapacity { needed: usize, available: usize },

    /// Header announces more bits than the image holds.
    #[error("Truncated payload: header announces {expected} bits, only {found} available")]
    TruncatedPayload { expected: usize, found: usize },

    /// Image too small for the requested operation.
    #[error("Image {width}x{height} is too small: {reason}")]
    ImageTooSmall {
        width: u32,
        height: u32,
        reason: String,
    },

    /// Two images that must match in size do not.
    #[error("Image dimensions differ: {left:?} vs {right:?}")]
    DimensionMismatch { left: (u32, u32), right: (u32, u32) },

    /// Cover text contains no words.
    #[error("Cover text contains no words")]
    NoWords,

    /// Hash function misuse (bad dimensions or word length).
    #[error("Hash error: {0}")]
    Hash(String),

    /// Numerical failure (singular system, non-finite result).
    #[error("Numeric error: {0}")]
    Numeric(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
