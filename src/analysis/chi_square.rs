//! Chi-square attack on pairs of values.
//!
//! LSB replacement equalises the frequencies of each pair of values that
//! differ only in the lowest bit. For every tile the low three bits are
//! binned into 8 categories and compared with the pair-averaged expectation.
//! The image is reported when the mean p-value over the tiles falls below
//! the threshold.

use crate::analysis::stats::chi_square_sf;
use crate::analysis::{AnalysisReport, Detector, Method, Verdict};
use crate::config::{chi_square_params, ChiSquareConfig};
use crate::error::{Error, Result};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Chi-square attack result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChiSquareReport {
    /// p-value of every usable tile, in raster order of the tiles.
    pub block_p_values: Vec<f64>,
    /// Tiles skipped because a bin was empty.
    pub skipped_blocks: usize,
    /// Mean of `block_p_values`, 0 when no tile was usable.
    pub mean_p_value: f64,
    /// Decision on the mean p-value.
    pub verdict: Verdict,
}

/// Chi-square attack.
#[derive(Debug, Clone, Default)]
pub struct ChiSquareAttack {
    config: ChiSquareConfig,
}

impl ChiSquareAttack {
    pub fn new(config: ChiSquareConfig) -> Self {
        Self { config }
    }

    /// Run the attack over all tiles of `img`.
    pub fn run(&self, img: &GrayImage) -> Result<ChiSquareReport> {
        let size = self.config.block_size;
        if size == 0 {
            return Err(Error::InvalidConfig(
                "chi_square.block_size must be greater than 0".to_string(),
            ));
        }

        let (width, height) = img.dimensions();
        let mut block_p_values = Vec::new();
        let mut skipped_blocks = 0;

        for by in (0..height).step_by(size as usize) {
            for bx in (0..width).step_by(size as usize) {
                let mut observed = [0u64; chi_square_params::BINS];
                for y in by..(by + size).min(height) {
                    for x in bx..(bx + size).min(width) {
                        observed[(img.get_pixel(x, y).0[0] & 0b111) as usize] += 1;
                    }
                }
                match block_p_value(&observed) {
                    Some(p) => block_p_values.push(p),
                    None => skipped_blocks += 1,
                }
            }
        }

        let mean_p_value = if block_p_values.is_empty() {
            0.0
        } else {
            block_p_values.iter().sum::<f64>() / block_p_values.len() as f64
        };
        let contains_payload = !block_p_values.is_empty() && mean_p_value < self.config.threshold;

        debug!(
            blocks = block_p_values.len(),
            skipped = skipped_blocks,
            mean_p = mean_p_value,
            "Chi-square attack finished"
        );

        Ok(ChiSquareReport {
            block_p_values,
            skipped_blocks,
            mean_p_value,
            verdict: Verdict {
                contains_payload,
                score: mean_p_value,
                threshold: self.config.threshold,
            },
        })
    }
}

impl Detector for ChiSquareAttack {
    fn method(&self) -> Method {
        Method::ChiSquare
    }

    fn analyze(&self, img: &GrayImage) -> Result<AnalysisReport> {
        self.run(img).map(AnalysisReport::ChiSquare)
    }
}

/// Expected counts: each pair shares its total, the smaller bin taking the
/// floor of an odd split.
fn expected_counts(observed: &[u64]) -> Vec<u64> {
    let mut expected = vec![0; observed.len()];
    for i in (0..observed.len()).step_by(2) {
        let (a, b) = (observed[i], observed[i + 1]);
        let half = (a + b) / 2;
        let rest = a + b - half;
        if a < b {
            expected[i] = half;
            expected[i + 1] = rest;
        } else {
            expected[i] = rest;
            expected[i + 1] = half;
        }
    }
    expected
}

/// Merge sparse bins so each holds at least the mean count.
fn merge_bins(observed: &[u64], expected: &[u64]) -> (Vec<u64>, Vec<u64>) {
    let mean = observed.iter().sum::<u64>() as f64 / observed.len() as f64;
    let mut obs = Vec::with_capacity(observed.len());
    let mut exp = Vec::with_capacity(observed.len());

    let mut i = 0;
    while i < observed.len() {
        let mut o = observed[i];
        let mut e = expected[i];
        i += 1;
        while (o as f64) < mean && i < observed.len() {
            o += observed[i];
            e += expected[i];
            i += 1;
        }
        obs.push(o);
        exp.push(e);
    }

    if obs.len() >= 2 && (obs[obs.len() - 1] as f64) < mean {
        let (o, e) = (obs.pop(), exp.pop());
        if let (Some(o), Some(e), Some(lo), Some(le)) = (o, e, obs.last_mut(), exp.last_mut()) {
            *lo += o;
            *le += e;
        }
    }

    (obs, exp)
}

/// p-value of one tile, `None` when the tile is unusable.
fn block_p_value(observed: &[u64]) -> Option<f64> {
    let expected = expected_counts(observed);
    let (obs, exp) = merge_bins(observed, &expected);

    if obs.iter().chain(&exp).any(|&count| count == 0) {
        return None;
    }
    if obs.len() <= 2 {
        return Some(1.0);
    }

    let statistic: f64 = obs
        .iter()
        .zip(&exp)
        .map(|(&o, &e)| {
            let diff = o as f64 - e as f64;
            diff * diff / e as f64
        })
        .sum();
    Some(chi_square_sf(statistic, obs.len() - 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::Lcg;
    use image::Luma;

    fn attack(block_size: u32) -> ChiSquareAttack {
        ChiSquareAttack::new(ChiSquareConfig {
            block_size,
            ..ChiSquareConfig::default()
        })
    }

    #[test]
    fn test_expected_counts_odd_split() {
        assert_eq!(
            expected_counts(&[3, 6, 4, 4, 7, 0, 1, 2]),
            vec![4, 5, 4, 4, 4, 3, 1, 2]
        );
    }

    #[test]
    fn test_merge_bins() {
        // Mean 10: 2 + 3 + 6 reaches it, 30 and 36 stand alone, the 1s never
        // reach it and fold into the previous bin.
        let observed = [2, 3, 6, 30, 36, 1, 1, 1];
        let expected = [1, 4, 6, 30, 30, 7, 1, 1];
        let (obs, exp) = merge_bins(&observed, &expected);
        assert_eq!(obs, vec![11, 30, 39]);
        assert_eq!(exp, vec![11, 30, 39]);
    }

    #[test]
    fn test_balanced_pairs_not_flagged() {
        // Low bits cycle through all 8 values equally in every tile.
        let img = GrayImage::from_fn(64, 64, |x, y| Luma([((x + y) % 8 + 64) as u8]));
        let report = attack(32).run(&img).unwrap();

        assert_eq!(report.block_p_values.len(), 4);
        assert!(report.block_p_values.iter().all(|&p| (p - 1.0).abs() < 1e-9));
        assert!(!report.verdict.contains_payload);
    }

    #[test]
    fn test_even_cover_flagged() {
        let mut rng = Lcg::new(42);
        let img = GrayImage::from_fn(64, 64, |_, _| Luma([(rng.next_u32() % 128 * 2) as u8]));
        let report = attack(32).run(&img).unwrap();

        assert!(report.mean_p_value < 1e-6);
        assert!(report.verdict.contains_payload);
        assert_eq!(report.verdict.score, report.mean_p_value);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // Every tile has p = 1, so only a threshold above 1 reports it.
        let img = GrayImage::from_pixel(16, 16, Luma([9]));
        let strict = ChiSquareAttack::new(ChiSquareConfig {
            block_size: 8,
            threshold: 1.0,
        });
        assert!(!strict.run(&img).unwrap().verdict.contains_payload);

        let loose = ChiSquareAttack::new(ChiSquareConfig {
            block_size: 8,
            threshold: 1.5,
        });
        assert!(loose.run(&img).unwrap().verdict.contains_payload);
    }

    #[test]
    fn test_no_usable_tiles_not_flagged() {
        let report = attack(8).run(&GrayImage::new(0, 0)).unwrap();
        assert!(report.block_p_values.is_empty());
        assert_eq!(report.mean_p_value, 0.0);
        assert!(!report.verdict.contains_payload);
    }

    #[test]
    fn test_random_blocks_in_range() {
        let mut rng = Lcg::new(7);
        let img = GrayImage::from_fn(128, 128, |_, _| Luma([(rng.next_u32() % 256) as u8]));
        let report = attack(32).run(&img).unwrap();

        assert_eq!(report.block_p_values.len() + report.skipped_blocks, 16);
        assert!(report
            .block_p_values
            .iter()
            .all(|p| (0.0..=1.0).contains(p)));
        let low = report.block_p_values.iter().filter(|&&p| p < 0.5).count();
        let high = report.block_p_values.len() - low;
        assert!(high > low, "uniform noise should look like balanced pairs");
    }

    #[test]
    fn test_constant_image_collapses_to_one_bin() {
        let img = GrayImage::from_pixel(16, 16, Luma([9]));
        let report = attack(8).run(&img).unwrap();

        assert_eq!(report.block_p_values, vec![1.0; 4]);
        assert_eq!(report.skipped_blocks, 0);
    }

    #[test]
    fn test_empty_tile_unusable() {
        assert_eq!(block_p_value(&[0; 8]), None);
    }

    #[test]
    fn test_partial_edge_tiles() {
        let img = GrayImage::from_fn(40, 20, |x, y| Luma([((x * 3 + y) % 8) as u8]));
        let report = attack(16).run(&img).unwrap();
        assert_eq!(report.block_p_values.len() + report.skipped_blocks, 6);
    }
}
