use std::sync::OnceLock;

use super::{BinaryFilter, BlockFilter, binarize_all};
use crate::models::{BitMatrix, BitRow, PixelSource};
use crate::utils::integral::IntegralImage;

/// Block filter followed by removal of thin strokes and isolated pixels.
///
/// A black pixel survives only when more than `sensitivity` of its
/// `(2r+1)^2` window is black.
#[derive(Debug)]
pub struct GridFilter {
    block: BlockFilter,
    radius: usize,
    sensitivity: f32,
    cleaned: OnceLock<BitMatrix>,
}

impl GridFilter {
    /// Wrap `block` with a window of `radius` and keep-ratio `sensitivity`
    pub fn new(block: BlockFilter, radius: usize, sensitivity: f32) -> Self {
        Self {
            block,
            radius,
            sensitivity,
            cleaned: OnceLock::new(),
        }
    }

    /// Cleaned bitmap, built on first use
    pub fn bitmap(&self, source: &dyn PixelSource) -> &BitMatrix {
        self.cleaned.get_or_init(|| self.clean(source))
    }

    fn clean(&self, source: &dyn PixelSource) -> BitMatrix {
        let bits = binarize_all(&self.block, source);
        let integral = IntegralImage::build(bits.width(), bits.height(), |x, y| {
            bits.get(x, y) as u32
        });
        let mut out = bits.clone();
        let mut erased = 0usize;
        for y in 0..bits.height() {
            for x in 0..bits.width() {
                if !bits.get(x, y) {
                    continue;
                }
                let (sum, area) = integral.window(x, y, self.radius);
                if sum as f32 <= self.sensitivity * area as f32 {
                    out.set(x, y, false);
                    erased += 1;
                }
            }
        }
        log::debug!("grid filter erased {erased} pixels");
        out
    }
}

impl BinaryFilter for GridFilter {
    fn binarize_row(&self, source: &dyn PixelSource, y: usize, out: &mut BitRow) {
        *out = self.bitmap(source).row(y).clone();
    }

    fn binarize_column(&self, source: &dyn PixelSource, x: usize, out: &mut BitRow) {
        *out = self.bitmap(source).column(x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GrayImage;

    #[test]
    fn test_isolated_pixel_is_erased() {
        let mut img = GrayImage::filled(32, 32, 220);
        img.set(10, 10, 10);
        img.fill_rect(20, 4, 28, 28, 10);
        let filter = GridFilter::new(BlockFilter::new(24), 2, 0.25);
        let bits = filter.bitmap(&img);
        assert!(!bits.get(10, 10));
        // solid region keeps its interior
        assert!(bits.get(24, 16));
    }

    #[test]
    fn test_row_matches_bitmap() {
        let mut img = GrayImage::filled(24, 16, 200);
        img.fill_rect(4, 0, 12, 16, 30);
        let filter = GridFilter::new(BlockFilter::new(24), 1, 0.3);
        let mut row = BitRow::new(24);
        filter.binarize_row(&img, 5, &mut row);
        assert_eq!(&row, filter.bitmap(&img).row(5));
    }
}
