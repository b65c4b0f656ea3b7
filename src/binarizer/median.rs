use std::sync::OnceLock;

use rayon::prelude::*;

use super::{BinaryFilter, BlockFilter, binarize_all};
use crate::config::MedianNeighbors;
use crate::models::{BitMatrix, BitRow, GrayImage, PixelSource};

const FOUR: [(i64, i64); 5] = [(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)];
const EIGHT: [(i64, i64); 9] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

fn offsets(neighbors: MedianNeighbors) -> &'static [(i64, i64)] {
    match neighbors {
        MedianNeighbors::Four => &FOUR,
        MedianNeighbors::Eight => &EIGHT,
    }
}

/// Block filter with a median applied to the grayscale input (prefilter)
/// or to the binary output (postfilter)
#[derive(Debug)]
pub enum MedianFilter {
    /// Median on grayscale, then block thresholds
    Prefilter {
        /// Neighborhood
        neighbors: MedianNeighbors,
        /// Thresholds over the smoothed image
        block: BlockFilter,
        /// Smoothed image, built on first use
        smoothed: OnceLock<GrayImage>,
    },
    /// Block thresholds, then majority vote on the bitmap
    Postfilter {
        /// Neighborhood
        neighbors: MedianNeighbors,
        /// Thresholds over the input
        block: BlockFilter,
        /// Voted bitmap, built on first use
        voted: OnceLock<BitMatrix>,
    },
}

impl MedianFilter {
    /// Median before thresholding
    pub fn prefilter(neighbors: MedianNeighbors, adjustment_level: u8) -> Self {
        MedianFilter::Prefilter {
            neighbors,
            block: BlockFilter::new(adjustment_level),
            smoothed: OnceLock::new(),
        }
    }

    /// Median after thresholding
    pub fn postfilter(neighbors: MedianNeighbors, adjustment_level: u8) -> Self {
        MedianFilter::Postfilter {
            neighbors,
            block: BlockFilter::new(adjustment_level),
            voted: OnceLock::new(),
        }
    }
}

/// Grayscale median over the given neighborhood; border pixels use the
/// neighbors that exist
pub fn median_image(source: &dyn PixelSource, neighbors: MedianNeighbors) -> GrayImage {
    let (width, height) = (source.width(), source.height());
    let offsets = offsets(neighbors);
    let mut out = GrayImage::filled(width, height, 0);
    out.as_bytes_mut()
        .par_chunks_mut(width.max(1))
        .enumerate()
        .for_each(|(y, row)| {
            let mut window = Vec::with_capacity(offsets.len());
            for (x, value) in row.iter_mut().enumerate() {
                window.clear();
                for &(dx, dy) in offsets {
                    let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                    if nx >= 0 && ny >= 0 && (nx as usize) < width && (ny as usize) < height {
                        window.push(source.pixel(nx as usize, ny as usize));
                    }
                }
                window.sort_unstable();
                *value = window[window.len() / 2];
            }
        });
    out
}

/// Majority vote of each pixel's neighborhood; ties keep the pixel
pub fn majority_vote(bits: &BitMatrix, neighbors: MedianNeighbors) -> BitMatrix {
    let offsets = offsets(neighbors);
    let width = bits.width();
    let rows: Vec<BitRow> = (0..bits.height())
        .into_par_iter()
        .map(|y| {
            let mut row = BitRow::new(width);
            for x in 0..width {
                let mut black = 0;
                let mut total = 0;
                for &(dx, dy) in offsets {
                    let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                    if nx >= 0 && ny >= 0 && (nx as usize) < width && (ny as usize) < bits.height() {
                        total += 1;
                        if bits.get(nx as usize, ny as usize) {
                            black += 1;
                        }
                    }
                }
                let value = match (2 * black).cmp(&total) {
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Less => false,
                    std::cmp::Ordering::Equal => bits.get(x, y),
                };
                row.set(x, value);
            }
            row
        })
        .collect();
    BitMatrix::from_rows(width, rows)
}

impl BinaryFilter for MedianFilter {
    fn binarize_row(&self, source: &dyn PixelSource, y: usize, out: &mut BitRow) {
        match self {
            MedianFilter::Prefilter {
                neighbors,
                block,
                smoothed,
            } => {
                let image = smoothed.get_or_init(|| median_image(source, *neighbors));
                block.binarize_row(image, y, out);
            }
            MedianFilter::Postfilter {
                neighbors,
                block,
                voted,
            } => {
                let bits = voted.get_or_init(|| majority_vote(&binarize_all(block, source), *neighbors));
                *out = bits.row(y).clone();
            }
        }
    }

    fn binarize_column(&self, source: &dyn PixelSource, x: usize, out: &mut BitRow) {
        match self {
            MedianFilter::Prefilter {
                neighbors,
                block,
                smoothed,
            } => {
                let image = smoothed.get_or_init(|| median_image(source, *neighbors));
                block.binarize_column(image, x, out);
            }
            MedianFilter::Postfilter {
                neighbors,
                block,
                voted,
            } => {
                let bits = voted.get_or_init(|| majority_vote(&binarize_all(block, source), *neighbors));
                *out = bits.column(x);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_removes_salt() {
        let mut img = GrayImage::filled(9, 9, 200);
        img.set(4, 4, 0);
        for neighbors in [MedianNeighbors::Four, MedianNeighbors::Eight] {
            let m = median_image(&img, neighbors);
            assert_eq!(m.pixel(4, 4), 200);
        }
    }

    #[test]
    fn test_majority_vote_fills_hole() {
        let mut bits = BitMatrix::new(5, 5);
        for y in 0..5 {
            for x in 0..5 {
                bits.set(x, y, true);
            }
        }
        bits.set(2, 2, false);
        let voted = majority_vote(&bits, MedianNeighbors::Eight);
        assert!(voted.get(2, 2));
    }

    #[test]
    fn test_postfilter_drops_speck() {
        let mut img = GrayImage::filled(16, 16, 220);
        img.set(5, 5, 0);
        let filter = MedianFilter::postfilter(MedianNeighbors::Four, 24);
        let mut row = BitRow::new(16);
        filter.binarize_row(&img, 5, &mut row);
        assert!(!row.get(5));
    }
}
