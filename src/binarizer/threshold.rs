use super::BinaryFilter;
use crate::models::{BitRow, PixelSource};

/// `black = pixel < level`; every line is independent
#[derive(Debug, Clone, Copy)]
pub struct FixedThreshold {
    level: u8,
}

impl FixedThreshold {
    /// Threshold at `level`
    pub fn new(level: u8) -> Self {
        Self { level }
    }

    /// The threshold level
    pub fn level(&self) -> u8 {
        self.level
    }
}

impl BinaryFilter for FixedThreshold {
    fn binarize_row(&self, source: &dyn PixelSource, y: usize, out: &mut BitRow) {
        for (x, &p) in source.row(y).iter().enumerate() {
            out.set(x, p < self.level);
        }
    }

    fn binarize_column(&self, source: &dyn PixelSource, x: usize, out: &mut BitRow) {
        for y in 0..source.height() {
            out.set(y, source.pixel(x, y) < self.level);
        }
    }
}

/// Trusts an already binary source: `pixel == 0` is black
#[derive(Debug, Clone, Copy, Default)]
pub struct BypassFilter;

impl BinaryFilter for BypassFilter {
    fn binarize_row(&self, source: &dyn PixelSource, y: usize, out: &mut BitRow) {
        for (x, &p) in source.row(y).iter().enumerate() {
            out.set(x, p == 0);
        }
    }

    fn binarize_column(&self, source: &dyn PixelSource, x: usize, out: &mut BitRow) {
        for y in 0..source.height() {
            out.set(y, source.pixel(x, y) == 0);
        }
    }
}
