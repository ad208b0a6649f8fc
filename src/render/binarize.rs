//! # Binarization
//!
//! Reduces a decoded image to a black/white [`Bitmap`]:
//!
//! 1. **Flatten**: composite any alpha over white paper
//! 2. **Grayscale**: average of R, G and B
//! 3. **Invert**: ink = 255 - gray, so dark pixels carry high ink
//! 4. **Threshold**: ink ≥ 128 prints a dot
//!
//! Steps 2-4 amount to "average luminance below 128 is black". No
//! dithering: label art is expected to be line art or already dithered.

use std::path::Path;

use image::DynamicImage;
use tracing::debug;

use super::bitmap::Bitmap;
use crate::error::ProtocolError;

/// Ink level at which a pixel becomes a printed dot
pub const THRESHOLD: u8 = 128;

/// Whether one RGBA pixel prints as a black dot.
///
/// ```
/// use niimbot::render::binarize::is_black;
///
/// assert!(is_black([0, 0, 0, 255]));
/// assert!(!is_black([255, 255, 255, 255]));
/// assert!(is_black([127, 127, 127, 255]));
/// assert!(!is_black([128, 128, 128, 255]));
/// assert!(!is_black([0, 0, 0, 0])); // fully transparent shows the paper
/// ```
#[inline]
pub fn is_black([r, g, b, a]: [u8; 4]) -> bool {
    let over_white = |c: u8| -> u32 {
        let a = a as u32;
        (c as u32 * a + 255 * (255 - a)) / 255
    };
    let gray = (over_white(r) + over_white(g) + over_white(b)) / 3;
    let ink = 255 - gray;
    ink >= THRESHOLD as u32
}

/// Binarize a decoded image.
pub fn binarize(image: &DynamicImage) -> Bitmap {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut bitmap = Bitmap::new(width as usize, height as usize);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        if is_black(pixel.0) {
            bitmap.set(x as usize, y as usize, true);
        }
    }
    debug!(width, height, black = bitmap.count_black(), "binarized image");
    bitmap
}

/// Load an image file and binarize it.
pub fn load_bitmap<P: AsRef<Path>>(path: P) -> Result<Bitmap, ProtocolError> {
    let path = path.as_ref();
    let image = image::open(path)
        .map_err(|e| ProtocolError::Image(format!("Failed to load {}: {}", path.display(), e)))?;
    Ok(binarize(&image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_binarize_checkerboard() {
        let mut img = RgbImage::new(2, 2);
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));
        img.put_pixel(0, 1, Rgb([200, 200, 200]));
        img.put_pixel(1, 1, Rgb([30, 60, 90]));

        let bitmap = binarize(&DynamicImage::ImageRgb8(img));
        assert_eq!(bitmap.row(0), Some(&[true, false][..]));
        assert_eq!(bitmap.row(1), Some(&[false, true][..]));
    }

    #[test]
    fn test_colored_pixels_use_average() {
        // avg(255, 0, 0) = 85 -> black
        assert!(is_black([255, 0, 0, 255]));
        // avg(255, 255, 0) = 170 -> white
        assert!(!is_black([255, 255, 0, 255]));
    }

    #[test]
    fn test_translucent_black() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 128]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 100]));
        let bitmap = binarize(&DynamicImage::ImageRgba8(img));
        // Half-opaque black over white is gray 127: just dark enough.
        assert!(bitmap.get(0, 0));
        assert!(!bitmap.get(1, 0));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_bitmap("/nonexistent/label.png").unwrap_err();
        assert!(matches!(err, ProtocolError::Image(_)));
    }
}
