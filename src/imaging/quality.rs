//! Distortion metrics between a cover and its stego image.

use crate::error::{Error, Result};
use image::GrayImage;

const MAX_PIXEL: f64 = 255.0;

/// Mean squared error between two equally sized images.
pub fn mse(a: &GrayImage, b: &GrayImage) -> Result<f64> {
    if a.dimensions() != b.dimensions() {
        return Err(Error::DimensionMismatch {
            left: a.dimensions(),
            right: b.dimensions(),
        });
    }
    let n = a.as_raw().len();
    if n == 0 {
        return Ok(0.0);
    }
    let sum: f64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    Ok(sum / n as f64)
}

/// Peak signal-to-noise ratio in dB. Identical images give infinity.
pub fn psnr(a: &GrayImage, b: &GrayImage) -> Result<f64> {
    let mse = mse(a, b)?;
    if mse == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(20.0 * (MAX_PIXEL / mse.sqrt()).log10())
}
