//! RS (regular/singular groups) analysis.
//!
//! Pixels are grouped, and each group's smoothness is measured before and
//! after flipping the LSBs selected by a checkerboard mask. LSB replacement
//! pulls the regular and singular counts of the positive and negative
//! flippings towards each other; solving the resulting quadratic estimates
//! the fraction of pixels carrying payload.

use crate::analysis::{AnalysisReport, Detector, Method, Verdict};
use crate::config::RsConfig;
use crate::error::{Error, Result};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Labels for [`RsReport::named_results`], in order.
pub const RESULT_NAMES: [&str; 28] = [
    "Number of regular groups (positive)",
    "Number of singular groups (positive)",
    "Number of regular groups (negative)",
    "Number of singular groups (negative)",
    "Difference for regular groups",
    "Difference for singular groups",
    "Percentage of regular groups (positive)",
    "Percentage of singular groups (positive)",
    "Percentage of regular groups (negative)",
    "Percentage of singular groups (negative)",
    "Difference for regular groups %",
    "Difference for singular groups %",
    "Number of regular groups (positive for all flipped)",
    "Number of singular groups (positive for all flipped)",
    "Number of regular groups (negative for all flipped)",
    "Number of singular groups (negative for all flipped)",
    "Difference for regular groups (all flipped)",
    "Difference for singular groups (all flipped)",
    "Percentage of regular groups (positive for all flipped)",
    "Percentage of singular groups (positive for all flipped)",
    "Percentage of regular groups (negative for all flipped)",
    "Percentage of singular groups (negative for all flipped)",
    "Difference for regular groups (all flipped) %",
    "Difference for singular groups (all flipped) %",
    "Total number of groups",
    "Estimated percent of flipped pixels",
    "Estimated message length (in percent of pixels)(p)",
    "Estimated message length (in bytes)",
];

/// Group classification counts for one pass over the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsCounts {
    /// Groups smoother before the positive flip.
    pub regular: u64,
    /// Groups smoother after the positive flip.
    pub singular: u64,
    /// Groups unchanged by the positive flip.
    pub unusable: u64,
    /// Groups smoother before the negative flip.
    pub neg_regular: u64,
    /// Groups smoother after the negative flip.
    pub neg_singular: u64,
    /// Groups unchanged by the negative flip.
    pub neg_unusable: u64,
}

impl RsCounts {
    fn total(&self) -> u64 {
        self.regular + self.singular + self.unusable
    }
}

/// RS analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsReport {
    /// Counts on the image as given.
    pub counts: RsCounts,
    /// Counts on the image with every LSB flipped.
    pub flipped: RsCounts,
    /// Root of the RS quadratic.
    pub x: f64,
    /// Estimated fraction of flipped pixels.
    pub estimated_flip_fraction: f64,
    /// Estimated message length as a fraction of the pixels.
    pub message_length: f64,
    /// Estimated message length in bytes.
    pub estimated_bytes: f64,
    /// Decision on the message length.
    pub verdict: Verdict,
}

impl RsReport {
    /// The classic 28 RS results with their labels.
    pub fn named_results(&self) -> Vec<(&'static str, f64)> {
        let c = &self.counts;
        let f = &self.flipped;
        let total = c.total() as f64;
        let pct = |v: f64| if total > 0.0 { v / total * 100.0 } else { 0.0 };
        let diff = |a: u64, b: u64| a.abs_diff(b) as f64;

        let values = [
            c.regular as f64,
            c.singular as f64,
            c.neg_regular as f64,
            c.neg_singular as f64,
            diff(c.regular, c.neg_regular),
            diff(c.singular, c.neg_singular),
            pct(c.regular as f64),
            pct(c.singular as f64),
            pct(c.neg_regular as f64),
            pct(c.neg_singular as f64),
            pct(diff(c.regular, c.neg_regular)),
            pct(diff(c.singular, c.neg_singular)),
            f.regular as f64,
            f.singular as f64,
            f.neg_regular as f64,
            f.neg_singular as f64,
            diff(f.regular, f.singular),
            diff(f.neg_regular, f.neg_singular),
            pct(f.regular as f64),
            pct(f.singular as f64),
            pct(f.neg_regular as f64),
            pct(f.neg_singular as f64),
            pct(diff(f.regular, f.singular)),
            pct(diff(f.neg_regular, f.neg_singular)),
            total,
            self.estimated_flip_fraction,
            self.message_length,
            self.estimated_bytes,
        ];

        RESULT_NAMES.iter().copied().zip(values).collect()
    }
}

/// RS analysis.
#[derive(Debug, Clone, Default)]
pub struct RsAnalysis {
    config: RsConfig,
}

impl RsAnalysis {
    pub fn new(config: RsConfig) -> Self {
        Self { config }
    }

    /// Run the analysis on `img`.
    pub fn run(&self, img: &GrayImage) -> Result<RsReport> {
        let (m, n) = (self.config.group_width, self.config.group_height);
        let group = (m * n) as usize;
        if group == 0 || group % 4 != 0 {
            return Err(Error::InvalidConfig(format!(
                "RS group {m}x{n} must contain a non-zero multiple of 4 pixels"
            )));
        }

        let (width, height) = img.dimensions();
        if width < m || height < n {
            return Err(Error::ImageTooSmall {
                width,
                height,
                reason: format!("RS needs at least one {m}x{n} group"),
            });
        }

        let masks = masks(m, n);
        let counts = self.count_groups(img, &masks, false);
        let flipped = self.count_groups(img, &masks, true);

        let x = solve_x(&counts, &flipped);
        let estimated_flip_fraction = if x == 1.0 {
            0.0
        } else {
            (x / (2.0 * (x - 1.0))).abs()
        };
        let message_length = if x == 0.5 { 0.0 } else { (x / (x - 0.5)).abs() };
        let estimated_bytes = width as f64 * height as f64 * message_length / 8.0;

        debug!(
            regular = counts.regular,
            singular = counts.singular,
            x,
            message_length,
            "RS analysis finished"
        );

        Ok(RsReport {
            counts,
            flipped,
            x,
            estimated_flip_fraction,
            message_length,
            estimated_bytes,
            verdict: Verdict {
                contains_payload: message_length > self.config.threshold,
                score: message_length,
                threshold: self.config.threshold,
            },
        })
    }

    fn count_groups(&self, img: &GrayImage, masks: &[Vec<bool>; 2], flip_all: bool) -> RsCounts {
        let (m, n) = (self.config.group_width, self.config.group_height);
        let (step_x, step_y) = if self.config.overlap { (1, 1) } else { (m, n) };
        let (width, height) = img.dimensions();

        let mut counts = RsCounts::default();
        let mut block = Vec::with_capacity((m * n) as usize);

        for sy in (0..=height - n).step_by(step_y as usize) {
            for sx in (0..=width - m).step_by(step_x as usize) {
                block.clear();
                for i in 0..n {
                    for j in 0..m {
                        let v = img.get_pixel(sx + j, sy + i).0[0] as i32;
                        block.push(if flip_all { flip(v) } else { v });
                    }
                }

                let base = variation(&block);
                for mask in masks {
                    let positive = variation(&apply(&block, mask, flip));
                    let negative = variation(&apply(&block, mask, shift));

                    match positive.cmp(&base) {
                        std::cmp::Ordering::Greater => counts.regular += 1,
                        std::cmp::Ordering::Less => counts.singular += 1,
                        std::cmp::Ordering::Equal => counts.unusable += 1,
                    }
                    match negative.cmp(&base) {
                        std::cmp::Ordering::Greater => counts.neg_regular += 1,
                        std::cmp::Ordering::Less => counts.neg_singular += 1,
                        std::cmp::Ordering::Equal => counts.neg_unusable += 1,
                    }
                }
            }
        }

        counts
    }
}

impl Detector for RsAnalysis {
    fn method(&self) -> Method {
        Method::Rs
    }

    fn analyze(&self, img: &GrayImage) -> Result<AnalysisReport> {
        self.run(img).map(AnalysisReport::Rs)
    }
}

/// Complementary checkerboard masks over a row-major `m × n` group.
fn masks(m: u32, n: u32) -> [Vec<bool>; 2] {
    let first: Vec<bool> = (0..n)
        .flat_map(|i| (0..m).map(move |j| i % 2 == j % 2))
        .collect();
    let second = first.iter().map(|&b| !b).collect();
    [first, second]
}

/// `F1`: 0 <-> 1, 2 <-> 3, ...
fn flip(v: i32) -> i32 {
    v ^ 1
}

/// `F-1`: -1 <-> 0, 1 <-> 2, ..., 255 <-> 256.
fn shift(v: i32) -> i32 {
    flip(v + 1) - 1
}

fn apply(block: &[i32], mask: &[bool], f: fn(i32) -> i32) -> Vec<i32> {
    block
        .iter()
        .zip(mask)
        .map(|(&v, &selected)| if selected { f(v) } else { v })
        .collect()
}

/// Smoothness of a group, summed over its quadruples.
fn variation(block: &[i32]) -> i32 {
    block
        .chunks_exact(4)
        .map(|q| {
            (q[0] - q[1]).abs() + (q[3] - q[2]).abs() + (q[1] - q[3]).abs() + (q[2] - q[0]).abs()
        })
        .sum()
}

fn linear_estimate(c: &RsCounts, f: &RsCounts) -> f64 {
    let ratio = |num: f64, den: f64| if den == 0.0 { 0.0 } else { num / den };
    let (r, s) = (c.regular as f64, c.singular as f64);
    let (rm, sm) = (c.neg_regular as f64, c.neg_singular as f64);
    let (r1, s1) = (f.regular as f64, f.singular as f64);
    let (rm1, sm1) = (f.neg_regular as f64, f.neg_singular as f64);

    let cr = ratio(rm - r, r1 - r + rm - rm1);
    let cs = ratio(sm - s, s1 - s + sm - sm1);
    (cr + cs) / 2.0
}

/// Root of the RS quadratic with the smaller magnitude.
fn solve_x(c: &RsCounts, f: &RsCounts) -> f64 {
    let d0 = c.regular as f64 - c.singular as f64;
    let dm0 = c.neg_regular as f64 - c.neg_singular as f64;
    let d1 = f.regular as f64 - f.singular as f64;
    let dm1 = f.neg_regular as f64 - f.neg_singular as f64;

    let a = 2.0 * (d1 + d0);
    let b = dm0 - dm1 - d1 - 3.0 * d0;
    let c0 = d0 - dm0;

    let x = if a == 0.0 {
        // Degenerates to b·x + c0 = 0.
        if b == 0.0 {
            0.0
        } else {
            -c0 / b
        }
    } else {
        let discriminant = b * b - 4.0 * a * c0;
        if discriminant >= 0.0 {
            let root = discriminant.sqrt();
            let pos = (-b + root) / (2.0 * a);
            let neg = (-b - root) / (2.0 * a);
            if pos.abs() <= neg.abs() {
                pos
            } else {
                neg
            }
        } else {
            linear_estimate(c, f)
        }
    };

    if x == 0.0 {
        linear_estimate(c, f)
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::{lsb_replace, natural_cover};
    use image::Luma;

    /// Counts from `[R, S, R-M, S-M]`; unusable groups do not enter `solve_x`.
    fn counts([regular, singular, neg_regular, neg_singular]: [u64; 4]) -> RsCounts {
        RsCounts {
            regular,
            singular,
            neg_regular,
            neg_singular,
            ..RsCounts::default()
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-12, "got {actual}, expected {expected}");
    }

    #[test]
    fn test_solve_x_smaller_root() {
        // d0 = 1, d-0 = 0, d1 = 1, d-1 = -10: 4x² + 6x + 1 = 0.
        let x = solve_x(&counts([3, 2, 5, 5]), &counts([3, 2, 0, 10]));
        assert_close(x, (-6.0 + 20f64.sqrt()) / 8.0);
    }

    #[test]
    fn test_solve_x_linear_when_a_is_zero() {
        // d0 = 5, d1 = -5 so a = 0; b = -8, c = 2.
        let x = solve_x(&counts([15, 10, 13, 10]), &counts([10, 15, 11, 10]));
        assert_close(x, 0.25);
    }

    #[test]
    fn test_solve_x_all_zero_coefficients() {
        // a = b = 0 gives x = 0, and the fallback has only zero denominators.
        let x = solve_x(&counts([10, 10, 12, 8]), &counts([10, 10, 12, 8]));
        assert_eq!(x, 0.0);
    }

    #[test]
    fn test_solve_x_negative_discriminant() {
        // a = 20, b = -10, c = 5.
        let (c, f) = (counts([10, 5, 14, 14]), counts([10, 5, 2, 12]));
        let x = solve_x(&c, &f);
        assert_close(x, (4.0 / 12.0 + 9.0 / 2.0) / 2.0);
        assert_eq!(x, linear_estimate(&c, &f));
    }

    #[test]
    fn test_solve_x_zero_root_falls_back() {
        // c = 0: roots 0.75 and 0; the zero root is replaced.
        let x = solve_x(&counts([4, 2, 6, 4]), &counts([5, 3, 4, 4]));
        assert_close(x, (2.0 / 3.0 + 2.0) / 2.0);
    }

    #[test]
    fn test_linear_estimate_zero_denominator() {
        // cr has a zero denominator and contributes 0; cs = 2 / 4.
        let x = linear_estimate(&counts([10, 10, 12, 12]), &counts([10, 12, 12, 10]));
        assert_close(x, 0.25);
    }

    #[test]
    fn test_flip_functions() {
        assert_eq!(flip(0), 1);
        assert_eq!(flip(255), 254);
        assert_eq!(shift(0), -1);
        assert_eq!(shift(-1), 0);
        assert_eq!(shift(1), 2);
        assert_eq!(shift(255), 256);
    }

    #[test]
    fn test_masks() {
        let [m0, m1] = masks(2, 2);
        assert_eq!(m0, vec![true, false, false, true]);
        assert_eq!(m1, vec![false, true, true, false]);
    }

    #[test]
    fn test_variation() {
        assert_eq!(variation(&[10, 10, 10, 10]), 0);
        // |1-2| + |4-3| + |2-4| + |3-1|
        assert_eq!(variation(&[1, 2, 3, 4]), 6);
    }

    #[test]
    fn test_clean_cover_estimate_small() {
        let img = natural_cover(64, 64, 7);
        let report = RsAnalysis::default().run(&img).unwrap();
        assert!(report.message_length < 0.15, "got {}", report.message_length);
        assert!(!report.verdict.contains_payload);
    }

    #[test]
    fn test_full_replacement_estimate_large() {
        let img = lsb_replace(&natural_cover(64, 64, 7), 1.0, 12);
        let report = RsAnalysis::default().run(&img).unwrap();
        assert!(report.message_length > 0.6, "got {}", report.message_length);
        assert!(report.verdict.contains_payload);
    }

    #[test]
    fn test_group_counts() {
        let img = natural_cover(10, 6, 1);
        let overlap = RsAnalysis::default().run(&img).unwrap();
        // 9 * 5 positions, two masks each.
        assert_eq!(overlap.counts.total(), 90);

        let tiled = RsAnalysis::new(RsConfig {
            overlap: false,
            ..RsConfig::default()
        })
        .run(&img)
        .unwrap();
        assert_eq!(tiled.counts.total(), 30);
        assert_eq!(tiled.flipped.total(), 30);
    }

    #[test]
    fn test_named_results() {
        let img = natural_cover(32, 32, 3);
        let report = RsAnalysis::default().run(&img).unwrap();
        let named = report.named_results();

        assert_eq!(named.len(), 28);
        assert_eq!(named[0].1, report.counts.regular as f64);
        assert_eq!(named[24].1, report.counts.total() as f64);
        assert_eq!(named[26], (RESULT_NAMES[26], report.message_length));
    }

    #[test]
    fn test_image_too_small() {
        let img = GrayImage::from_pixel(1, 5, Luma([3]));
        let result = RsAnalysis::default().run(&img);
        assert!(matches!(result, Err(Error::ImageTooSmall { .. })));
    }

    #[test]
    fn test_flat_image_has_no_estimate() {
        let img = GrayImage::from_pixel(16, 16, Luma([100]));
        let report = RsAnalysis::default().run(&img).unwrap();
        assert!(report.message_length.is_finite());
    }
}
