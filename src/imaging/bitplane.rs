//! Bit-plane visualization.

use crate::error::{Error, Result};
use image::{DynamicImage, GrayImage, Luma};

/// Render one bit plane as a black/white image.
///
/// A pixel is white (255) when bit `bit` is set. Colour images light a pixel
/// when the bit is set in any of the red, green or blue channels; grayscale
/// images use the luma value.
pub fn bit_plane(img: &DynamicImage, bit: u8) -> Result<GrayImage> {
    if bit > 7 {
        return Err(Error::InvalidBitIndex(bit));
    }

    let plane = if img.color().has_color() {
        let rgb = img.to_rgb8();
        GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            let [r, g, b] = rgb.get_pixel(x, y).0;
            lit((r | g | b) >> bit & 1)
        })
    } else {
        let gray = img.to_luma8();
        GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            lit(gray.get_pixel(x, y).0[0] >> bit & 1)
        })
    };

    Ok(plane)
}

fn lit(bit: u8) -> Luma<u8> {
    Luma([if bit == 1 { 255 } else { 0 }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_gray_lsb_plane() {
        let gray = GrayImage::from_fn(4, 1, |x, _| Luma([x as u8]));
        let plane = bit_plane(&DynamicImage::ImageLuma8(gray), 0).unwrap();
        let values: Vec<u8> = plane.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![0, 255, 0, 255]);
    }

    #[test]
    fn test_gray_high_plane() {
        let gray = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 0x80 } else { 0x7F }]));
        let plane = bit_plane(&DynamicImage::ImageLuma8(gray), 7).unwrap();
        assert_eq!(plane.get_pixel(0, 0).0[0], 255);
        assert_eq!(plane.get_pixel(1, 0).0[0], 0);
    }

    #[test]
    fn test_rgb_plane_ors_channels() {
        let mut rgb = RgbImage::new(3, 1);
        rgb.put_pixel(0, 0, Rgb([0b10, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([0, 0, 0b10]));
        rgb.put_pixel(2, 0, Rgb([1, 1, 1]));

        let plane = bit_plane(&DynamicImage::ImageRgb8(rgb), 1).unwrap();
        assert_eq!(plane.get_pixel(0, 0).0[0], 255);
        assert_eq!(plane.get_pixel(1, 0).0[0], 255);
        assert_eq!(plane.get_pixel(2, 0).0[0], 0);
    }

    #[test]
    fn test_invalid_bit() {
        let gray = GrayImage::new(1, 1);
        let result = bit_plane(&DynamicImage::ImageLuma8(gray), 8);
        assert!(matches!(result, Err(Error::InvalidBitIndex(8))));
    }
}
