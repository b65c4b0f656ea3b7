use std::sync::OnceLock;

use log::debug;

use super::{BinaryFilter, BlockFilter, binarize_all};
use crate::models::{BitMatrix, BitRow, PixelSource};
use crate::utils::integral::IntegralImage;

const CORNER_DENSE: f32 = 0.5;
const CORNER_SPARSE: f32 = 0.25;

/// Block filter followed by corner filling, for dot-peened marks where each
/// module is a separate dot
#[derive(Debug)]
pub struct SmoothedFilter {
    block: BlockFilter,
    radius: usize,
    filled: OnceLock<BitMatrix>,
}

impl SmoothedFilter {
    /// Wrap `block`, filling discs of `radius` around corner pixels
    pub fn new(block: BlockFilter, radius: usize) -> Self {
        Self {
            block,
            radius: radius.max(1),
            filled: OnceLock::new(),
        }
    }

    /// Smoothed bitmap, built on first use
    pub fn bitmap(&self, source: &dyn PixelSource) -> &BitMatrix {
        self.filled.get_or_init(|| self.smooth(source))
    }

    fn smooth(&self, source: &dyn PixelSource) -> BitMatrix {
        let bits = binarize_all(&self.block, source);
        let (w, h) = (bits.width(), bits.height());
        let integral = IntegralImage::build(w, h, |x, y| bits.get(x, y) as u32);
        let r = self.radius;
        let mut out = bits.clone();
        let mut corners = 0usize;

        for y in 0..h {
            for x in 0..w {
                if !bits.get(x, y) || !is_corner(&integral, x, y, r) {
                    continue;
                }
                corners += 1;
                fill_disc(&mut out, x, y, r);
            }
        }
        debug!("smoothed filter filled {corners} corners");
        out
    }
}

/// Black density of the r x r square touching (x, y) on the given side
fn quadrant_density(integral: &IntegralImage, x: usize, y: usize, r: usize, east: bool, south: bool) -> f32 {
    let (x0, x1) = if east { (x + 1, x + 1 + r) } else { (x.saturating_sub(r), x) };
    let (y0, y1) = if south { (y + 1, y + 1 + r) } else { (y.saturating_sub(r), y) };
    let x1 = x1.min(integral.width());
    let y1 = y1.min(integral.height());
    if x0 >= x1 || y0 >= y1 {
        return 0.0;
    }
    let area = ((x1 - x0) * (y1 - y0)) as f32;
    integral.sum(x0, y0, x1, y1) as f32 / area
}

/// Exactly one dense quadrant, all others sparse
fn is_corner(integral: &IntegralImage, x: usize, y: usize, r: usize) -> bool {
    let densities = [
        quadrant_density(integral, x, y, r, false, false),
        quadrant_density(integral, x, y, r, true, false),
        quadrant_density(integral, x, y, r, false, true),
        quadrant_density(integral, x, y, r, true, true),
    ];
    let dense = densities.iter().filter(|&&d| d >= CORNER_DENSE).count();
    let sparse = densities.iter().filter(|&&d| d <= CORNER_SPARSE).count();
    dense == 1 && sparse == 3
}

fn fill_disc(bits: &mut BitMatrix, cx: usize, cy: usize, r: usize) {
    let r2 = (r * r) as i64;
    let (w, h) = (bits.width() as i64, bits.height() as i64);
    for dy in -(r as i64)..=r as i64 {
        for dx in -(r as i64)..=r as i64 {
            let (x, y) = (cx as i64 + dx, cy as i64 + dy);
            if dx * dx + dy * dy <= r2 && x >= 0 && y >= 0 && x < w && y < h {
                bits.set(x as usize, y as usize, true);
            }
        }
    }
}

impl BinaryFilter for SmoothedFilter {
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
    fn test_dot_corners_are_grown() {
        let mut img = GrayImage::filled(24, 24, 220);
        img.fill_rect(10, 10, 13, 13, 0);
        let filter = SmoothedFilter::new(BlockFilter::new(24), 2);
        let bits = filter.bitmap(&img);
        assert!(bits.get(10, 10));
        assert!(bits.get(8, 10));
        assert!(bits.get(14, 12));
        // far pixels untouched
        assert!(!bits.get(2, 2));
    }

    #[test]
    fn test_straight_edge_is_not_a_corner() {
        let mut bits = BitMatrix::new(12, 12);
        for y in 0..12 {
            for x in 0..6 {
                bits.set(x, y, true);
            }
        }
        let integral = IntegralImage::build(12, 12, |x, y| bits.get(x, y) as u32);
        assert!(!is_corner(&integral, 5, 6, 2));
    }
}
