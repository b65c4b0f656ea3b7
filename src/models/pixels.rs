use crate::error::{Result, ScanError};
use crate::utils::grayscale::{rgb_to_grayscale_parallel, rgba_to_grayscale_parallel};

/// Row-major 8-bit grayscale input.
///
/// Implemented by image-decoding collaborators; the scanner only reads rows.
pub trait PixelSource: Sync {
    /// Width in pixels
    fn width(&self) -> usize;
    /// Height in pixels
    fn height(&self) -> usize;
    /// Luminance values of row `y` (`width()` bytes, 0 = black)
    fn row(&self, y: usize) -> &[u8];

    /// Luminance at (x, y)
    fn pixel(&self, x: usize, y: usize) -> u8 {
        self.row(y)[x]
    }
}

/// Owned grayscale image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl GrayImage {
    /// Wrap a row-major buffer, checking its size against the dimensions
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ScanError::EmptyImage { width, height });
        }
        let expected = width * height;
        if data.len() != expected {
            return Err(ScanError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Image filled with one luminance value
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Convert packed RGB bytes
    pub fn from_rgb(rgb: &[u8], width: usize, height: usize) -> Result<Self> {
        if rgb.len() != width * height * 3 {
            return Err(ScanError::BufferSize {
                expected: width * height * 3,
                actual: rgb.len(),
            });
        }
        Self::new(width, height, rgb_to_grayscale_parallel(rgb, width, height))
    }

    /// Convert packed RGBA bytes (alpha ignored)
    pub fn from_rgba(rgba: &[u8], width: usize, height: usize) -> Result<Self> {
        if rgba.len() != width * height * 4 {
            return Err(ScanError::BufferSize {
                expected: width * height * 4,
                actual: rgba.len(),
            });
        }
        Self::new(width, height, rgba_to_grayscale_parallel(rgba, width, height))
    }

    /// Raw buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw buffer
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Set pixel (x, y); out-of-range writes are ignored
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    /// Fill the rectangle `[x0, x1) x [y0, y1)` clipped to the image
    pub fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, value: u8) {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        for y in y0..y1 {
            let start = y * self.width;
            if x0 < x1 {
                self.data[start + x0..start + x1].fill(value);
            }
        }
    }
}

impl PixelSource for GrayImage {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn row(&self, y: usize) -> &[u8] {
        let start = y * self.width;
        &self.data[start..start + self.width]
    }
}

impl From<image::GrayImage> for GrayImage {
    fn from(img: image::GrayImage) -> Self {
        let (w, h) = img.dimensions();
        Self {
            width: w as usize,
            height: h as usize,
            data: img.into_raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_size() {
        assert!(GrayImage::new(2, 2, vec![0; 4]).is_ok());
        assert_eq!(
            GrayImage::new(2, 2, vec![0; 3]),
            Err(ScanError::BufferSize {
                expected: 4,
                actual: 3
            })
        );
        assert!(matches!(
            GrayImage::new(0, 5, vec![]),
            Err(ScanError::EmptyImage { .. })
        ));
    }

    #[test]
    fn test_rows_and_fill() {
        let mut img = GrayImage::filled(4, 3, 200);
        img.fill_rect(1, 1, 3, 2, 10);
        assert_eq!(img.row(1), &[200, 10, 10, 200]);
        assert_eq!(img.pixel(0, 0), 200);
    }

    #[test]
    fn test_from_rgb() {
        let img = GrayImage::from_rgb(&[0, 0, 0, 255, 255, 255], 2, 1).unwrap();
        assert_eq!(img.row(0)[0], 0);
        assert!(img.row(0)[1] >= 254);
    }
}
