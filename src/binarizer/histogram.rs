use log::trace;

use super::BinaryFilter;
use crate::models::{BitRow, PixelSource};

const LUMINANCE_BITS: u32 = 5;
const LUMINANCE_SHIFT: u32 = 8 - LUMINANCE_BITS;
const LUMINANCE_BUCKETS: usize = 1 << LUMINANCE_BITS;

/// Per-line threshold from a 32-bucket histogram of edge-enhanced luminance.
///
/// Lines without two distinct peaks are unusable and come back all white.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistogramFilter;

impl HistogramFilter {
    /// Create the filter
    pub fn new() -> Self {
        Self
    }

    /// Binarize one line of luminance values into `out`
    pub fn binarize_line(&self, line: &[u8], out: &mut BitRow) {
        let enhanced = enhance(line);
        let mut buckets = [0u32; LUMINANCE_BUCKETS];
        for &v in &enhanced {
            buckets[(v >> LUMINANCE_SHIFT) as usize] += 1;
        }
        let Some(black_point) = estimate_black_point(&buckets) else {
            trace!("line of {} pixels has no usable contrast", line.len());
            out.clear();
            return;
        };
        for (i, &v) in enhanced.iter().enumerate() {
            out.set(i, (v as u32) < black_point);
        }
    }
}

impl BinaryFilter for HistogramFilter {
    fn binarize_row(&self, source: &dyn PixelSource, y: usize, out: &mut BitRow) {
        self.binarize_line(source.row(y), out);
    }

    fn binarize_column(&self, source: &dyn PixelSource, x: usize, out: &mut BitRow) {
        let column: Vec<u8> = (0..source.height()).map(|y| source.pixel(x, y)).collect();
        self.binarize_line(&column, out);
    }
}

/// `-1 4 -1` sharpening, halved and clamped; end pixels pass through
fn enhance(line: &[u8]) -> Vec<u8> {
    let n = line.len();
    let mut out = line.to_vec();
    if n < 3 {
        return out;
    }
    for x in 1..n - 1 {
        let v = (4 * line[x] as i32 - line[x - 1] as i32 - line[x + 1] as i32) / 2;
        out[x] = v.clamp(0, 255) as u8;
    }
    out
}

/// Valley between the two dominant histogram peaks, in luminance units.
///
/// Returns `None` when the peaks are closer than 1/16 of the bucket range.
pub(crate) fn estimate_black_point(buckets: &[u32]) -> Option<u32> {
    let num_buckets = buckets.len();
    let mut max_bucket_count = 0;
    let mut first_peak = 0;
    for (x, &count) in buckets.iter().enumerate() {
        if count > max_bucket_count {
            first_peak = x;
            max_bucket_count = count;
        }
    }

    // Second peak: tall and far from the first one
    let mut second_peak = 0;
    let mut second_peak_score = 0u64;
    for (x, &count) in buckets.iter().enumerate() {
        let distance = x.abs_diff(first_peak) as u64;
        let score = count as u64 * distance * distance;
        if score > second_peak_score {
            second_peak = x;
            second_peak_score = score;
        }
    }

    let (first_peak, second_peak) = if first_peak > second_peak {
        (second_peak, first_peak)
    } else {
        (first_peak, second_peak)
    };

    if second_peak - first_peak <= num_buckets / 16 {
        return None;
    }

    // Deepest valley, leaning toward the second (light) peak
    let mut best_valley = second_peak - 1;
    let mut best_valley_score = -1i64;
    for x in (first_peak + 1..second_peak).rev() {
        let from_first = (x - first_peak) as i64;
        let score = from_first
            * from_first
            * (second_peak - x) as i64
            * (max_bucket_count as i64 - buckets[x] as i64);
        if score > best_valley_score {
            best_valley = x;
            best_valley_score = score;
        }
    }

    Some((best_valley as u32) << LUMINANCE_SHIFT)
}
