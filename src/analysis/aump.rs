//! AUMP detector.
//!
//! Every row is cut into segments of `block_size` pixels and each segment is
//! predicted by a least-squares polynomial. The residuals, weighted by the
//! inverse local noise variance, are correlated with the direction an LSB
//! flip would move each pixel. Clean images give a statistic near zero.

use crate::analysis::{AnalysisReport, Detector, Method, Verdict};
use crate::config::{aump_params, AumpConfig};
use crate::error::{Error, Result};
use image::GrayImage;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// AUMP detector result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AumpReport {
    /// Detection statistic.
    pub beta: f64,
    /// Number of fitted segments.
    pub segments: usize,
    /// Columns used after cropping to a multiple of the segment length.
    pub columns: u32,
    /// Decision on `beta`.
    pub verdict: Verdict,
}

/// AUMP detector.
#[derive(Debug, Clone, Default)]
pub struct AumpDetector {
    config: AumpConfig,
}

impl AumpDetector {
    pub fn new(config: AumpConfig) -> Self {
        Self { config }
    }

    /// Run the detector on `img`.
    pub fn run(&self, img: &GrayImage) -> Result<AumpReport> {
        let m = self.config.block_size as usize;
        let q = self.config.degree as usize + 1;
        if q >= m {
            return Err(Error::InvalidConfig(format!(
                "aump.degree + 1 ({q}) must be smaller than aump.block_size ({m})"
            )));
        }

        let (width, height) = img.dimensions();
        if (width as usize) < m {
            return Err(Error::ImageTooSmall {
                width,
                height,
                reason: format!("AUMP needs at least {m} columns"),
            });
        }

        let projection = projection_matrix(m, q)?;
        let columns = (width as usize / m) * m;

        struct Segment {
            values: DVector<f64>,
            residuals: DVector<f64>,
            variance: f64,
        }

        let mut segments = Vec::with_capacity(height as usize * columns / m);
        for y in 0..height {
            for start in (0..columns).step_by(m) {
                let values = DVector::from_iterator(
                    m,
                    (start..start + m).map(|x| img.get_pixel(x as u32, y).0[0] as f64),
                );
                let residuals = &values - &projection * &values;
                let rss = residuals.norm_squared();
                let variance = (rss / (m - q) as f64).max(aump_params::MIN_VARIANCE);
                segments.push(Segment {
                    values,
                    residuals,
                    variance,
                });
            }
        }

        let kn = segments.len() as f64;
        let inverse_sum: f64 = segments.iter().map(|s| 1.0 / s.variance).sum();
        let sn2 = kn / inverse_sum;
        let norm = (sn2 / (kn * (m - q) as f64)).sqrt();

        let beta: f64 = segments
            .iter()
            .map(|seg| {
                let weight = norm / seg.variance;
                seg.values
                    .iter()
                    .zip(seg.residuals.iter())
                    .map(|(&v, &r)| {
                        let direction = 2.0 * (v as u32 % 2) as f64 - 1.0;
                        weight * direction * r
                    })
                    .sum::<f64>()
            })
            .sum();

        if !beta.is_finite() {
            return Err(Error::Numeric(format!("AUMP statistic is {beta}")));
        }

        debug!(beta, segments = segments.len(), "AUMP finished");

        Ok(AumpReport {
            beta,
            segments: segments.len(),
            columns: columns as u32,
            verdict: Verdict {
                contains_payload: beta > self.config.threshold,
                score: beta,
                threshold: self.config.threshold,
            },
        })
    }
}

impl Detector for AumpDetector {
    fn method(&self) -> Method {
        Method::Aump
    }

    fn analyze(&self, img: &GrayImage) -> Result<AnalysisReport> {
        self.run(img).map(AnalysisReport::Aump)
    }
}

/// Singular values below this are treated as zero in the pseudo-inverse.
const RANK_EPSILON: f64 = 1e-10;

/// `m × m` least-squares projection `H H⁺` onto the polynomials of degree
/// below `q`, with `H[i][k] = ((i + 1) / m)^k`.
fn projection_matrix(m: usize, q: usize) -> Result<DMatrix<f64>> {
    let h = DMatrix::from_fn(m, q, |i, k| ((i + 1) as f64 / m as f64).powi(k as i32));

    let svd = h.clone().svd(true, true);
    let rank = svd.rank(RANK_EPSILON);
    if rank < q {
        return Err(Error::Numeric(format!(
            "polynomial basis has rank {rank}, expected {q}"
        )));
    }
    let pseudo_inverse = svd
        .pseudo_inverse(RANK_EPSILON)
        .map_err(|e| Error::Numeric(e.to_string()))?;

    Ok(h * pseudo_inverse)
}
