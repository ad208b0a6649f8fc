//! # Binarized Bitmap
//!
//! A row-major raster where every pixel is already black (`true`, print a
//! dot) or white (`false`). This is the input to the line encoder.
//!
//! ```text
//! (0,0) ──────────────────────► x (width)
//!   │   ░░██░░░░
//!   │   ░░██░░░░   ← one scanline = `width` pixels
//!   ▼
//!   y (paper feed direction)
//! ```

use image::{GrayImage, Luma};

use crate::error::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    pixels: Vec<bool>,
}

impl Bitmap {
    /// All-white bitmap.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; width * height],
        }
    }

    /// Wrap row-major pixels, checking the length against the dimensions.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<bool>) -> Result<Self, ProtocolError> {
        if pixels.len() != width * height {
            return Err(ProtocolError::InvalidArgument(format!(
                "{} pixels do not make a {}x{} bitmap",
                pixels.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from rows of 0/1 values. All rows must share one width.
    ///
    /// ```
    /// use niimbot::render::bitmap::Bitmap;
    ///
    /// let bitmap = Bitmap::from_rows(&[[1u8, 0, 0], [0, 0, 1]])?;
    /// assert_eq!((bitmap.width(), bitmap.height()), (3, 2));
    /// assert!(bitmap.get(2, 1));
    /// # Ok::<(), niimbot::ProtocolError>(())
    /// ```
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self, ProtocolError> {
        let width = rows.first().map_or(0, |r| r.as_ref().len());
        let mut pixels = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != width {
                return Err(ProtocolError::InvalidArgument(format!(
                    "row {} has {} pixels, expected {}",
                    y,
                    row.len(),
                    width
                )));
            }
            pixels.extend(row.iter().map(|&v| v != 0));
        }
        Ok(Self {
            width,
            height: rows.len(),
            pixels,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.pixels[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, black: bool) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = black;
        }
    }

    /// One scanline, or `None` past the last row.
    #[inline]
    pub fn row(&self, y: usize) -> Option<&[bool]> {
        if y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width..(y + 1) * self.width)
    }

    /// All scanlines, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        // chunks_exact(0) panics; a zero-width bitmap has no visible rows.
        self.pixels.chunks_exact(self.width.max(1)).take(self.height)
    }

    /// Number of black pixels.
    pub fn count_black(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }

    /// Render as a grayscale image (black = 0, white = 255) for previews.
    pub fn to_gray_image(&self) -> GrayImage {
        let mut img = GrayImage::new(self.width as u32, self.height as u32);
        for y in 0..self.height {
            for x in 0..self.width {
                let color = if self.get(x, y) { 0u8 } else { 255u8 };
                img.put_pixel(x as u32, y as u32, Luma([color]));
            }
        }
        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_white() {
        let bitmap = Bitmap::new(16, 4);
        assert_eq!(bitmap.count_black(), 0);
        assert_eq!(bitmap.rows().count(), 4);
    }

    #[test]
    fn test_from_pixels_length_check() {
        assert!(Bitmap::from_pixels(4, 2, vec![false; 8]).is_ok());
        assert!(Bitmap::from_pixels(4, 2, vec![false; 7]).is_err());
    }

    #[test]
    fn test_from_rows_ragged() {
        let rows: Vec<Vec<u8>> = vec![vec![1, 0], vec![1]];
        assert!(Bitmap::from_rows(&rows).is_err());
    }

    #[test]
    fn test_set_get_out_of_bounds() {
        let mut bitmap = Bitmap::new(2, 2);
        bitmap.set(5, 5, true);
        assert_eq!(bitmap.count_black(), 0);
        assert!(!bitmap.get(5, 5));
        bitmap.set(1, 0, true);
        assert_eq!(bitmap.row(0), Some(&[false, true][..]));
    }

    #[test]
    fn test_row_past_end_is_none() {
        let bitmap = Bitmap::new(2, 2);
        assert_eq!(bitmap.row(1), Some(&[false, false][..]));
        assert_eq!(bitmap.row(2), None);
        assert_eq!(bitmap.row(usize::MAX), None);
    }

    #[test]
    fn test_zero_width_has_no_rows() {
        let bitmap = Bitmap::new(0, 3);
        assert_eq!(bitmap.rows().count(), 0);
    }

    #[test]
    fn test_gray_preview() {
        let bitmap = Bitmap::from_rows(&[[1u8, 0]]).unwrap();
        let img = bitmap.to_gray_image();
        assert_eq!(img.get_pixel(0, 0).0, [0]);
        assert_eq!(img.get_pixel(1, 0).0, [255]);
    }
}
