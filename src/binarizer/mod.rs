//! Binarization filters
//!
//! Every strategy turns a [`PixelSource`] into black/white lines through the
//! [`BinaryFilter`] trait. [`Filter`] is the closed set of strategies, chosen
//! once per image, and [`Binarizer`] adds the lazily filled row and column
//! caches the scanners read from.

use std::sync::OnceLock;

use log::debug;
use rayon::prelude::*;

use crate::config::{FilterKind, MedianStage, ScanConfig};
use crate::models::{BinaryGrid, BitMatrix, BitRow, PixelSource};

/// 8x8 block thresholds with 5x5 and superblock smoothing
pub mod block;
/// Block filter plus integral-image cleanup of thin strokes
pub mod grid;
/// 32-bucket per-line histogram valley
pub mod histogram;
/// 4/8-neighbor median before or after block thresholding
pub mod median;
/// Corner filling for dot-peened marks
pub mod smoothed;
/// Fixed level and pre-binarized sources
pub mod threshold;

pub use block::BlockFilter;
pub use grid::GridFilter;
pub use histogram::HistogramFilter;
pub use median::MedianFilter;
pub use smoothed::SmoothedFilter;
pub use threshold::{BypassFilter, FixedThreshold};

/// Common contract of all binarization strategies (true = black)
pub trait BinaryFilter: Send + Sync {
    /// Fill `out` (source width bits) with row `y`
    fn binarize_row(&self, source: &dyn PixelSource, y: usize, out: &mut BitRow);

    /// Fill `out` (source height bits) with column `x`
    fn binarize_column(&self, source: &dyn PixelSource, x: usize, out: &mut BitRow);
}

/// The interchangeable strategies
pub enum Filter {
    /// Fixed level
    Fixed(FixedThreshold),
    /// Global histogram per line
    Histogram(HistogramFilter),
    /// Block-adaptive (current or legacy math)
    Block(BlockFilter),
    /// Block + grid cleanup
    Grid(GridFilter),
    /// Block + median
    Median(MedianFilter),
    /// Block + corner smoothing
    Smoothed(SmoothedFilter),
    /// Already binary
    Bypass(BypassFilter),
}

impl Filter {
    /// Build the strategy `kind` for an image of the given size.
    ///
    /// Block-based strategies need at least one full 8x8 block; smaller
    /// images use the histogram filter instead.
    pub fn from_config(kind: FilterKind, config: &ScanConfig, width: usize, height: usize) -> Self {
        let block_based = !matches!(
            kind,
            FilterKind::Fixed | FilterKind::Histogram | FilterKind::Bypass
        );
        if block_based && !BlockFilter::fits(width, height) {
            debug!("{width}x{height} is smaller than one block, using histogram filter");
            return Filter::Histogram(HistogramFilter::new());
        }

        match kind {
            FilterKind::Fixed => Filter::Fixed(FixedThreshold::new(config.threshold_level)),
            FilterKind::Histogram => Filter::Histogram(HistogramFilter::new()),
            FilterKind::Block => Filter::Block(BlockFilter::new(config.adjustment_level)),
            FilterKind::LegacyBlock => Filter::Block(BlockFilter::legacy()),
            FilterKind::Grid => Filter::Grid(GridFilter::new(
                BlockFilter::new(config.adjustment_level),
                config.grid_radius,
                config.grid_sensitivity,
            )),
            FilterKind::Median => Filter::Median(match config.median.stage {
                MedianStage::Prefilter => {
                    MedianFilter::prefilter(config.median.neighbors, config.adjustment_level)
                }
                MedianStage::Postfilter => {
                    MedianFilter::postfilter(config.median.neighbors, config.adjustment_level)
                }
            }),
            FilterKind::Smoothed => Filter::Smoothed(SmoothedFilter::new(
                BlockFilter::new(config.adjustment_level),
                config.smooth_radius,
            )),
            FilterKind::Bypass => Filter::Bypass(BypassFilter),
        }
    }

    fn as_dyn(&self) -> &dyn BinaryFilter {
        match self {
            Filter::Fixed(f) => f,
            Filter::Histogram(f) => f,
            Filter::Block(f) => f,
            Filter::Grid(f) => f,
            Filter::Median(f) => f,
            Filter::Smoothed(f) => f,
            Filter::Bypass(f) => f,
        }
    }
}

impl BinaryFilter for Filter {
    fn binarize_row(&self, source: &dyn PixelSource, y: usize, out: &mut BitRow) {
        self.as_dyn().binarize_row(source, y, out)
    }

    fn binarize_column(&self, source: &dyn PixelSource, x: usize, out: &mut BitRow) {
        self.as_dyn().binarize_column(source, x, out)
    }
}

/// Lines computed at most once each, on first access
#[derive(Debug, Default)]
pub struct LineCache {
    lines: Vec<OnceLock<BitRow>>,
}

impl LineCache {
    /// Cache with `count` empty slots
    pub fn new(count: usize) -> Self {
        Self {
            lines: (0..count).map(|_| OnceLock::new()).collect(),
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when there are no slots
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Cached line `i`, computing it with `compute` on first access
    pub fn get_or_compute<F: FnOnce() -> BitRow>(&self, i: usize, compute: F) -> &BitRow {
        self.lines[i].get_or_init(compute)
    }

    /// Number of lines already computed
    pub fn filled(&self) -> usize {
        self.lines.iter().filter(|l| l.get().is_some()).count()
    }

    /// Drop every cached line
    pub fn reset(&mut self) {
        let count = self.lines.len();
        self.lines = (0..count).map(|_| OnceLock::new()).collect();
    }
}

/// One active filter over one image, with row and column caches
pub struct Binarizer<'a> {
    source: &'a dyn PixelSource,
    filter: Filter,
    kind: FilterKind,
    rows: LineCache,
    columns: LineCache,
}

impl<'a> Binarizer<'a> {
    /// Binarize `source` with strategy `kind`
    pub fn new(source: &'a dyn PixelSource, kind: FilterKind, config: &ScanConfig) -> Self {
        let (width, height) = (source.width(), source.height());
        Self {
            source,
            filter: Filter::from_config(kind, config, width, height),
            kind,
            rows: LineCache::new(height),
            columns: LineCache::new(width),
        }
    }

    /// Binarize `source` with an explicit filter instance
    pub fn with_filter(source: &'a dyn PixelSource, filter: Filter, kind: FilterKind) -> Self {
        Self {
            source,
            filter,
            kind,
            rows: LineCache::new(source.height()),
            columns: LineCache::new(source.width()),
        }
    }

    /// Strategy this binarizer was built with
    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Image width
    pub fn width(&self) -> usize {
        self.source.width()
    }

    /// Image height
    pub fn height(&self) -> usize {
        self.source.height()
    }

    /// Binarized row `y`
    pub fn row(&self, y: usize) -> &BitRow {
        self.rows.get_or_compute(y, || {
            let mut out = BitRow::new(self.source.width());
            self.filter.binarize_row(self.source, y, &mut out);
            out
        })
    }

    /// Binarized column `x`
    pub fn column(&self, x: usize) -> &BitRow {
        self.columns.get_or_compute(x, || {
            let mut out = BitRow::new(self.source.height());
            self.filter.binarize_column(self.source, x, &mut out);
            out
        })
    }

    /// Invalidate row and column caches together
    pub fn reset_columns(&mut self) {
        self.rows.reset();
        self.columns.reset();
    }

    /// Compute every row in parallel
    pub fn prefill(&self) {
        (0..self.height()).into_par_iter().for_each(|y| {
            self.row(y);
        });
    }

    /// Rows computed so far
    pub fn cached_rows(&self) -> usize {
        self.rows.filled()
    }

    /// Copy the whole binarized image
    pub fn to_matrix(&self) -> BitMatrix {
        self.prefill();
        let rows = (0..self.height()).map(|y| self.row(y).clone()).collect();
        BitMatrix::from_rows(self.width(), rows)
    }
}

impl BinaryGrid for Binarizer<'_> {
    fn width(&self) -> usize {
        self.source.width()
    }

    fn height(&self) -> usize {
        self.source.height()
    }

    fn get(&self, x: usize, y: usize) -> bool {
        y < self.source.height() && self.row(y).get(x)
    }
}

/// Binarize every row of `source` with `filter` into a matrix, rows in parallel
pub(crate) fn binarize_all(filter: &dyn BinaryFilter, source: &dyn PixelSource) -> BitMatrix {
    let width = source.width();
    let rows: Vec<BitRow> = (0..source.height())
        .into_par_iter()
        .map(|y| {
            let mut row = BitRow::new(width);
            filter.binarize_row(source, y, &mut row);
            row
        })
        .collect();
    BitMatrix::from_rows(width, rows)
}
