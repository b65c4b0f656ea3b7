//! Summed-area tables for O(1) rectangle sums.

use rayon::prelude::*;

/// Prefix-sum table with one extra leading row and column of zeros
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: usize,
    height: usize,
    sums: Vec<u32>,
}

impl IntegralImage {
    /// Build from a per-pixel value function (rows computed in parallel,
    /// then accumulated vertically)
    pub fn build<F>(width: usize, height: usize, value: F) -> Self
    where
        F: Fn(usize, usize) -> u32 + Sync,
    {
        let stride = width + 1;
        let mut sums = vec![0u32; stride * (height + 1)];
        // horizontal prefix per row
        sums[stride..]
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| {
                let mut acc = 0u32;
                for x in 0..width {
                    acc += value(x, y);
                    row[x + 1] = acc;
                }
            });
        for y in 1..=height {
            for x in 1..=width {
                sums[y * stride + x] += sums[(y - 1) * stride + x];
            }
        }
        Self {
            width,
            height,
            sums,
        }
    }

    /// Width of the source image
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the source image
    pub fn height(&self) -> usize {
        self.height
    }

    /// Sum over `[x0, x1) x [y0, y1)`, clipped to the image
    pub fn sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> u32 {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return 0;
        }
        let s = self.width + 1;
        self.sums[y1 * s + x1] + self.sums[y0 * s + x0]
            - self.sums[y0 * s + x1]
            - self.sums[y1 * s + x0]
    }

    /// Sum over the square of radius `r` centered on (x, y), with the
    /// number of pixels actually covered after clipping
    pub fn window(&self, x: usize, y: usize, r: usize) -> (u32, u32) {
        let x0 = x.saturating_sub(r);
        let y0 = y.saturating_sub(r);
        let x1 = (x + r + 1).min(self.width);
        let y1 = (y + r + 1).min(self.height);
        let area = (x1.saturating_sub(x0) * y1.saturating_sub(y0)) as u32;
        (self.sum(x0, y0, x1, y1), area)
    }
}
