//! Image loading, bit-plane visualization and quality metrics.

mod bitplane;
mod quality;

pub use bitplane::bit_plane;
pub use quality::{mse, psnr};

use crate::error::Result;
use image::{DynamicImage, GrayImage};
use std::path::Path;
use tracing::{debug, warn};

/// Extensions treated as images when collecting analysis inputs.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "bmp", "jpg", "jpeg", "tif", "tiff"];

/// Open any supported image.
pub fn load(path: &Path) -> Result<DynamicImage> {
    let img = image::open(path)?;
    debug!(path = %path.display(), width = img.width(), height = img.height(), "Loaded image");
    Ok(img)
}

/// Open an image and convert it to 8-bit grayscale.
pub fn load_gray(path: &Path) -> Result<GrayImage> {
    Ok(load(path)?.to_luma8())
}

/// Save a grayscale image; the format follows the file extension.
pub fn save_gray(path: &Path, img: &GrayImage) -> Result<()> {
    if is_lossy(path) {
        warn!(
            path = %path.display(),
            "Saving to a lossy format destroys any embedded payload"
        );
    }
    img.save(path)?;
    Ok(())
}

/// Whether the path names a lossy image format.
pub fn is_lossy(path: &Path) -> bool {
    matches!(extension(path).as_deref(), Some("jpg") | Some("jpeg"))
}

/// Whether the path has one of the supported image extensions.
pub fn has_image_extension(path: &Path) -> bool {
    extension(path)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
