//! Steganalysis detectors.
//!
//! Three independent detectors look for LSB embedding in grayscale images:
//!
//! - [`ChiSquareAttack`]: pair-of-values histogram test on image tiles
//! - [`RsAnalysis`]: regular/singular group counts, estimates message length
//! - [`AumpDetector`]: polynomial prediction residuals weighted by local noise
//!
//! [`analyze_batch`] runs any combination of them over many files on a
//! rayon pool.

mod aump;
mod batch;
mod chi_square;
mod rs;
mod stats;

pub use aump::{AumpDetector, AumpReport};
pub use batch::{analyze_batch, collect_images, BatchEntry};
pub use chi_square::{ChiSquareAttack, ChiSquareReport};
pub use rs::{RsAnalysis, RsCounts, RsReport};
pub use stats::chi_square_sf;

use crate::config::LabConfig;
use crate::error::Result;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Detection method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    ChiSquare,
    Rs,
    Aump,
}

impl Method {
    /// Every method, in report order.
    pub const ALL: [Method; 3] = [Method::ChiSquare, Method::Rs, Method::Aump];
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::ChiSquare => "chi-square",
            Method::Rs => "rs",
            Method::Aump => "aump",
        };
        f.write_str(name)
    }
}

/// Decision of one detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the detector believes a payload is present.
    pub contains_payload: bool,
    /// The score compared against the threshold.
    pub score: f64,
    /// Decision threshold.
    pub threshold: f64,
}

/// Result of one detector on one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum AnalysisReport {
    ChiSquare(ChiSquareReport),
    Rs(RsReport),
    Aump(AumpReport),
}

impl AnalysisReport {
    /// Method that produced the report.
    pub fn method(&self) -> Method {
        match self {
            AnalysisReport::ChiSquare(_) => Method::ChiSquare,
            AnalysisReport::Rs(_) => Method::Rs,
            AnalysisReport::Aump(_) => Method::Aump,
        }
    }

    /// The report's verdict.
    pub fn verdict(&self) -> Verdict {
        match self {
            AnalysisReport::ChiSquare(r) => r.verdict,
            AnalysisReport::Rs(r) => r.verdict,
            AnalysisReport::Aump(r) => r.verdict,
        }
    }
}

/// A steganalysis detector.
pub trait Detector: Send + Sync {
    /// Method implemented by the detector.
    fn method(&self) -> Method;

    /// Analyse a grayscale image.
    fn analyze(&self, img: &GrayImage) -> Result<AnalysisReport>;
}

/// Build detectors for `methods` from the configuration.
pub fn detectors(config: &LabConfig, methods: &[Method]) -> Vec<Box<dyn Detector>> {
    methods
        .iter()
        .map(|method| -> Box<dyn Detector> {
            match method {
                Method::ChiSquare => Box::new(ChiSquareAttack::new(config.chi_square.clone())),
                Method::Rs => Box::new(RsAnalysis::new(config.rs.clone())),
                Method::Aump => Box::new(AumpDetector::new(config.aump.clone())),
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use image::{GrayImage, Luma};

    /// Small deterministic generator so test images are reproducible.
    pub struct Lcg(u64);

    impl Lcg {
        pub fn new(seed: u64) -> Self {
            Self(seed)
        }

        pub fn next_u32(&mut self) -> u32 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 33) as u32
        }
    }

    /// Smooth gradient with light noise.
    pub fn natural_cover(width: u32, height: u32, seed: u64) -> GrayImage {
        let mut rng = Lcg::new(seed);
        let mut img = GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = 110.0
                    + 45.0 * (x as f64 * 0.11).sin()
                    + 35.0 * (y as f64 * 0.07).cos()
                    + 0.3 * x as f64;
                let noise = (rng.next_u32() % 5) as i32 - 2;
                let value = (v.round() as i32 + noise).clamp(0, 255);
                img.put_pixel(x, y, Luma([value as u8]));
            }
        }
        img
    }

    /// Replace the LSB of roughly `rate` of the pixels with random bits.
    pub fn lsb_replace(img: &GrayImage, rate: f64, seed: u64) -> GrayImage {
        let mut rng = Lcg::new(seed);
        let mut out = img.clone();
        let cutoff = (rate * 1000.0) as u32;
        for y in 0..img.height() {
            for x in 0..img.width() {
                if rng.next_u32() % 1000 < cutoff {
                    let bit = (rng.next_u32() & 1) as u8;
                    let pixel = out.get_pixel_mut(x, y);
                    pixel.0[0] = (pixel.0[0] & 0xFE) | bit;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detectors_follow_methods() {
        let config = LabConfig::default();
        let built = detectors(&config, &[Method::Aump, Method::ChiSquare]);
        let methods: Vec<Method> = built.iter().map(|d| d.method()).collect();
        assert_eq!(methods, vec![Method::Aump, Method::ChiSquare]);
    }

    #[test]
    fn test_report_serializes_with_method_tag() {
        let img = test_support::natural_cover(32, 32, 1);
        let report = AumpDetector::default().analyze(&img).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["method"], "aump");
        assert_eq!(report.method(), Method::Aump);
    }
}
