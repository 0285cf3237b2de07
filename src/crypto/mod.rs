//! Keyed whitening for embedded bit streams.
//!
//! This module provides:
//! - SHA-256 derivation of a keystream seed from a text key
//! - A ChaCha8 bit keystream applied by XOR

mod cipher;
mod kdf;

pub use cipher::{whiten, Keystream};
pub use kdf::{KeyDerivation, SEED_LENGTH};
