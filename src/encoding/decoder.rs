//! Hash block decoder.

use crate::encoding::hash::LinearHash;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Outcome of verifying hash blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockReport {
    /// Data bits of every block whose hash verified.
    pub data: Vec<u8>,
    /// Number of blocks read.
    pub total_blocks: usize,
    /// Number of blocks dropped because the hash did not match.
    pub corrupted_blocks: usize,
}

impl BlockReport {
    /// Report for data read without hash blocks: one intact block, or none
    /// when there is no data.
    pub fn intact(data: Vec<u8>) -> Self {
        Self {
            total_blocks: usize::from(!data.is_empty()),
            corrupted_blocks: 0,
            data,
        }
    }

    /// Whether every block verified.
    pub fn is_intact(&self) -> bool {
        self.corrupted_blocks == 0
    }

    /// Number of blocks that verified.
    pub fn valid_blocks(&self) -> usize {
        self.total_blocks - self.corrupted_blocks
    }
}

/// Verify and strip hash blocks produced by [`encode_blocks`].
///
/// Blocks whose hash does not match are dropped, counted and logged. A trailing
/// block may be short (fewer than `n` data bits); a trailing fragment that
/// cannot even hold the hash bits is ignored.
///
/// [`encode_blocks`]: crate::encoding::encode_blocks
pub fn decode_blocks(bits: &[u8], hash: &LinearHash) -> Result<BlockReport> {
    let n = hash.input_bits();
    let m = hash.output_bits();

    let mut data = Vec::with_capacity(bits.len());
    let mut total_blocks = 0;
    let mut corrupted_blocks = 0;

    for block in bits.chunks(n + m) {
        if block.len() <= m {
            debug!(trailing = block.len(), "Skipped incomplete trailing hash block");
            break;
        }
        let (segment, digest) = block.split_at(block.len() - m);
        let mut padded = segment.to_vec();
        padded.resize(n, 0);

        total_blocks += 1;
        if hash.hash(&padded)? == digest {
            data.extend_from_slice(segment);
        } else {
            corrupted_blocks += 1;
        }
    }

    if corrupted_blocks > 0 {
        warn!(
            corrupted = corrupted_blocks,
            total = total_blocks,
            "Dropped blocks that failed their hash"
        );
    }

    Ok(BlockReport {
        data,
        total_blocks,
        corrupted_blocks,
    })
}
