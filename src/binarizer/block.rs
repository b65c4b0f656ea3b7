use std::sync::OnceLock;

use log::debug;
use rayon::prelude::*;

use super::BinaryFilter;
use crate::models::{BitRow, PixelSource};

/// Block side in pixels
pub const BLOCK_SIZE: usize = 8;
const BLOCK_SHIFT: usize = 3;
/// Superblock side in blocks
pub const SUPERBLOCK_SIZE: usize = 6;
/// Contrast split used by the legacy variant
pub const LEGACY_ADJUSTMENT_LEVEL: u8 = 24;

/// Low-contrast block whose brightest pixel is below this is treated as ink
const DARK_BLOCK_LIMIT: f32 = 64.0;
/// Low-contrast block whose darkest pixel is above this is treated as paper
const LIGHT_BLOCK_LIMIT: f32 = 192.0;

/// Per-block thresholds, smoothed locally (5x5 blocks) and regionally
/// (superblocks).
#[derive(Debug)]
pub struct BlockFilter {
    adjustment_level: u8,
    superblock: usize,
    fractional: bool,
    thresholds: OnceLock<BlockThresholds>,
}

/// Final threshold of every block
#[derive(Debug, Clone)]
pub struct BlockThresholds {
    blocks_x: usize,
    blocks_y: usize,
    values: Vec<u16>,
}

impl BlockThresholds {
    /// Threshold of the block containing pixel (x, y)
    #[inline]
    pub fn at_pixel(&self, x: usize, y: usize) -> u16 {
        let bx = (x >> BLOCK_SHIFT).min(self.blocks_x - 1);
        let by = (y >> BLOCK_SHIFT).min(self.blocks_y - 1);
        self.values[by * self.blocks_x + bx]
    }

    /// Threshold of block (bx, by)
    pub fn at_block(&self, bx: usize, by: usize) -> u16 {
        self.values[by * self.blocks_x + bx]
    }

    /// Grid size in blocks
    pub fn dimensions(&self) -> (usize, usize) {
        (self.blocks_x, self.blocks_y)
    }
}

impl BlockFilter {
    /// Current variant: fractional math, 6x6 superblocks
    pub fn new(adjustment_level: u8) -> Self {
        Self {
            adjustment_level,
            superblock: SUPERBLOCK_SIZE,
            fractional: true,
            thresholds: OnceLock::new(),
        }
    }

    /// Legacy variant: integer math, no superblocks, contrast split 24
    pub fn legacy() -> Self {
        Self {
            adjustment_level: LEGACY_ADJUSTMENT_LEVEL,
            superblock: 1,
            fractional: false,
            thresholds: OnceLock::new(),
        }
    }

    /// True when the image holds at least one full block
    pub fn fits(width: usize, height: usize) -> bool {
        width >= BLOCK_SIZE && height >= BLOCK_SIZE
    }

    /// Thresholds for `source`, computed on first use
    pub fn thresholds(&self, source: &dyn PixelSource) -> &BlockThresholds {
        self.thresholds.get_or_init(|| self.compute(source))
    }

    /// True when pixel (x, y) is below its block threshold
    #[inline]
    pub fn is_black(&self, source: &dyn PixelSource, x: usize, y: usize) -> bool {
        (source.pixel(x, y) as u16) < self.thresholds(source).at_pixel(x, y)
    }

    fn div(&self, a: f32, b: f32) -> f32 {
        if self.fractional { a / b } else { (a / b).floor() }
    }

    fn compute(&self, source: &dyn PixelSource) -> BlockThresholds {
        let (width, height) = (source.width(), source.height());
        let blocks_x = width.div_ceil(BLOCK_SIZE);
        let blocks_y = height.div_ceil(BLOCK_SIZE);

        let averages = self.block_averages(source, blocks_x, blocks_y);
        let local = self.local_averages(&averages, blocks_x, blocks_y);

        let super_x = blocks_x.div_ceil(self.superblock);
        let super_y = blocks_y.div_ceil(self.superblock);
        let use_superblocks = self.superblock > 1 && super_x >= 2 && super_y >= 2;

        let values = if use_superblocks {
            let regional = self.regional_averages(&averages, blocks_x, blocks_y, super_x, super_y);
            local
                .iter()
                .enumerate()
                .map(|(i, &l)| {
                    let (bx, by) = (i % blocks_x, i / blocks_x);
                    let r = regional[(by / self.superblock) * super_x + bx / self.superblock];
                    let t = if self.fractional {
                        ((l + r) / 2.0).round()
                    } else {
                        ((l + r) / 2.0).floor()
                    };
                    t.clamp(0.0, 511.0) as u16
                })
                .collect()
        } else {
            local
                .iter()
                .map(|&l| l.round().clamp(0.0, 511.0) as u16)
                .collect()
        };

        debug!(
            "block thresholds: {blocks_x}x{blocks_y} blocks, superblocks {}",
            if use_superblocks { "on" } else { "off" }
        );

        BlockThresholds {
            blocks_x,
            blocks_y,
            values,
        }
    }

    /// Pass 1: per-block threshold from min/max/mean. Edge blocks are shifted
    /// inward so every block covers a full 8x8 area; an image narrower or
    /// shorter than one block uses what it has.
    fn block_averages(&self, source: &dyn PixelSource, blocks_x: usize, blocks_y: usize) -> Vec<f32> {
        let (width, height) = (source.width(), source.height());
        let level = self.adjustment_level as f32;
        let mut averages = vec![0f32; blocks_x * blocks_y];

        averages
            .par_chunks_mut(blocks_x)
            .enumerate()
            .for_each(|(by, out)| {
                let y_offset = (by * BLOCK_SIZE).min(height.saturating_sub(BLOCK_SIZE));
                let y_end = (y_offset + BLOCK_SIZE).min(height);
                for (bx, avg) in out.iter_mut().enumerate() {
                    let x_offset = (bx * BLOCK_SIZE).min(width.saturating_sub(BLOCK_SIZE));
                    let x_end = (x_offset + BLOCK_SIZE).min(width);
                    let area = ((y_end - y_offset) * (x_end - x_offset)) as f32;
                    let mut sum = 0u32;
                    let mut min = u8::MAX;
                    let mut max = u8::MIN;
                    for y in y_offset..y_end {
                        for &p in &source.row(y)[x_offset..x_end] {
                            sum += p as u32;
                            min = min.min(p);
                            max = max.max(p);
                        }
                    }
                    let (min, max) = (min as f32, max as f32);
                    *avg = if max - min > level {
                        self.div(sum as f32, area)
                    } else if max < DARK_BLOCK_LIMIT {
                        max * 2.0 + 1.0
                    } else if min > LIGHT_BLOCK_LIMIT {
                        self.div(min, 2.0) - 1.0
                    } else {
                        self.div(min, 2.0)
                    };
                }
            });
        averages
    }

    /// Pass 2: mean over the 5x5 block neighborhood, skipping blocks outside
    /// the grid
    fn local_averages(&self, averages: &[f32], blocks_x: usize, blocks_y: usize) -> Vec<f32> {
        let mut local = vec![0f32; averages.len()];
        local
            .par_chunks_mut(blocks_x)
            .enumerate()
            .for_each(|(by, out)| {
                for (bx, value) in out.iter_mut().enumerate() {
                    let mut sum = 0f32;
                    let mut count = 0f32;
                    for ny in by.saturating_sub(2)..(by + 3).min(blocks_y) {
                        for nx in bx.saturating_sub(2)..(bx + 3).min(blocks_x) {
                            sum += averages[ny * blocks_x + nx];
                            count += 1.0;
                        }
                    }
                    *value = self.div(sum, count);
                }
            });
        local
    }

    /// Pass 3: superblock means, then each superblock smoothed over its 3x3
    /// superblock neighborhood
    fn regional_averages(
        &self,
        averages: &[f32],
        blocks_x: usize,
        blocks_y: usize,
        super_x: usize,
        super_y: usize,
    ) -> Vec<f32> {
        let s = self.superblock;
        let mut means = vec![0f32; super_x * super_y];
        for sy in 0..super_y {
            for sx in 0..super_x {
                let mut sum = 0f32;
                let mut count = 0f32;
                for by in sy * s..((sy + 1) * s).min(blocks_y) {
                    for bx in sx * s..((sx + 1) * s).min(blocks_x) {
                        sum += averages[by * blocks_x + bx];
                        count += 1.0;
                    }
                }
                means[sy * super_x + sx] = self.div(sum, count);
            }
        }

        let mut regional = vec![0f32; means.len()];
        for sy in 0..super_y {
            for sx in 0..super_x {
                let mut sum = 0f32;
                let mut count = 0f32;
                for ny in sy.saturating_sub(1)..(sy + 2).min(super_y) {
                    for nx in sx.saturating_sub(1)..(sx + 2).min(super_x) {
                        sum += means[ny * super_x + nx];
                        count += 1.0;
                    }
                }
                regional[sy * super_x + sx] = self.div(sum, count);
            }
        }
        regional
    }
}

impl BinaryFilter for BlockFilter {
    fn binarize_row(&self, source: &dyn PixelSource, y: usize, out: &mut BitRow) {
        let thresholds = self.thresholds(source);
        for (x, &p) in source.row(y).iter().enumerate() {
            out.set(x, (p as u16) < thresholds.at_pixel(x, y));
        }
    }

    fn binarize_column(&self, source: &dyn PixelSource, x: usize, out: &mut BitRow) {
        let thresholds = self.thresholds(source);
        for y in 0..source.height() {
            out.set(y, (source.pixel(x, y) as u16) < thresholds.at_pixel(x, y));
        }
    }
}
