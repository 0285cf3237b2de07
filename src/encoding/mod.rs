//! Error-detecting hash blocks.
//!
//! Payload bits are cut into fixed-size segments and each segment is followed
//! by a linear GF(2) hash, so segments damaged in the container can be
//! detected and dropped on extraction.

mod decoder;
mod encoder;
mod hash;

pub use decoder::{decode_blocks, BlockReport};
pub use encoder::{encode_blocks, encoded_len};
pub use hash::LinearHash;
