//! Configuration constants and types for stego-lab.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of bits in the payload length header written by every image scheme.
pub const HEADER_BITS: usize = 32;

/// Key used when the caller does not supply one.
pub const DEFAULT_KEY: &str = "12345";

/// Default size of the analysis worker pool.
pub const DEFAULT_WORKERS: usize = 4;

/// Chi-square attack defaults.
pub mod chi_square_params {
    /// Side length of the square analysis tiles.
    pub const BLOCK_SIZE: u32 = 64;

    /// Mean p-value below which a payload is reported.
    pub const THRESHOLD: f64 = 0.5;

    /// Number of low-bit categories (3 bits).
    pub const BINS: usize = 8;
}

/// RS analysis defaults.
pub mod rs_params {
    /// Group width in pixels.
    pub const GROUP_WIDTH: u32 = 2;

    /// Group height in pixels.
    pub const GROUP_HEIGHT: u32 = 2;

    /// Estimated message length (fraction of pixels) above which a payload
    /// is reported. The lab exercise used 0.001, which flags most natural
    /// covers; set `rs.threshold` to 0.001 to reproduce its verdicts.
    pub const THRESHOLD: f64 = 0.15;
}

/// AUMP detector defaults.
pub mod aump_params {
    /// Segment length (pixels per fitted row segment).
    pub const BLOCK_SIZE: u32 = 16;

    /// Degree of the fitted polynomial.
    pub const DEGREE: u32 = 5;

    /// Statistic value above which a payload is reported. The lab exercise
    /// used 0.01; set `aump.threshold` to 0.01 to reproduce its verdicts.
    pub const THRESHOLD: f64 = 2.0;

    /// Lower bound for the per-segment noise variance.
    pub const MIN_VARIANCE: f64 = 1.0;
}

/// Hash block defaults.
pub mod hash_params {
    /// Data bits per hash block.
    pub const BLOCK_SIZE: usize = 8;

    /// Hash bits appended to each block.
    pub const HASH_BITS: usize = 1;
}

/// Chi-square attack settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChiSquareConfig {
    /// Tile side length.
    pub block_size: u32,
    /// Decision threshold on the mean p-value.
    pub threshold: f64,
}

impl Default for ChiSquareConfig {
    fn default() -> Self {
        Self {
            block_size: chi_square_params::BLOCK_SIZE,
            threshold: chi_square_params::THRESHOLD,
        }
    }
}

/// RS analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsConfig {
    /// Group width in pixels.
    pub group_width: u32,
    /// Group height in pixels.
    pub group_height: u32,
    /// Slide groups by one pixel instead of by a whole group.
    pub overlap: bool,
    /// Decision threshold on the estimated message length.
    pub threshold: f64,
}

impl Default for RsConfig {
    fn default() -> Self {
        Self {
            group_width: rs_params::GROUP_WIDTH,
            group_height: rs_params::GROUP_HEIGHT,
            overlap: true,
            threshold: rs_params::THRESHOLD,
        }
    }
}

/// AUMP detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AumpConfig {
    /// Segment length.
    pub block_size: u32,
    /// Polynomial degree.
    pub degree: u32,
    /// Decision threshold on the statistic.
    pub threshold: f64,
}

impl Default for AumpConfig {
    fn default() -> Self {
        Self {
            block_size: aump_params::BLOCK_SIZE,
            degree: aump_params::DEGREE,
            threshold: aump_params::THRESHOLD,
        }
    }
}

/// Error-detecting hash block settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    /// Data bits per block.
    pub block_size: usize,
    /// Hash bits per block. 1 selects plain parity.
    pub hash_bits: usize,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            block_size: hash_params::BLOCK_SIZE,
            hash_bits: hash_params::HASH_BITS,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Chi-square attack.
    pub chi_square: ChiSquareConfig,
    /// RS analysis.
    pub rs: RsConfig,
    /// AUMP detector.
    pub aump: AumpConfig,
    /// Hash blocks for the interpolation scheme.
    pub hash: HashConfig,
    /// Worker threads for batch analysis.
    pub workers: usize,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            chi_square: ChiSquareConfig::default(),
            rs: RsConfig::default(),
            aump: AumpConfig::default(),
            hash: HashConfig::default(),
            workers: DEFAULT_WORKERS,
        }
    }
}

impl LabConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.chi_square.block_size == 0 {
            return Err(invalid("chi_square.block_size must be greater than 0"));
        }

        let group = self.rs.group_width * self.rs.group_height;
        if group == 0 || group % 4 != 0 {
            return Err(invalid(format!(
                "RS group {}x{} must contain a non-zero multiple of 4 pixels",
                self.rs.group_width, self.rs.group_height
            )));
        }

        if self.aump.degree + 1 >= self.aump.block_size {
            return Err(invalid(format!(
                "aump.degree + 1 ({}) must be smaller than aump.block_size ({})",
                self.aump.degree + 1,
                self.aump.block_size
            )));
        }

        if self.workers == 0 {
            return Err(invalid("workers must be greater than 0"));
        }

        if self.hash.hash_bits == 0 || self.hash.hash_bits > self.hash.block_size {
            return Err(invalid(format!(
                "hash.hash_bits must be between 1 and hash.block_size ({})",
                self.hash.block_size
            )));
        }

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidConfig(msg.into())
}
