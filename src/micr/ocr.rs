//! Template OCR on an axis-aligned strip resampled along a MICR line.

use log::trace;

use super::glyphs::{GLYPHS, GlyphTemplate};
use crate::models::{BinaryGrid, BitMatrix, Point};

/// Matches with a larger RMS error are rejected
pub const ERROR_CEILING: f32 = 0.3;
/// Each crop edge may move this many pixels in either direction
const EDGE_SLACK: i64 = 2;
/// Cost per pixel of edge movement
const EDGE_MOVE_COST: f32 = 0.1;
/// Templates whose aspect ratio differs from the crop by more than this
/// factor are not tried
const MAX_ASPECT_RATIO: f32 = 1.5;

/// Binary strip whose x axis runs along a line.
///
/// Strip pixel (i, j) samples the source at `origin + (i+0.5)u + (j+0.5)n`.
#[derive(Debug, Clone, PartialEq)]
pub struct Strip {
    /// Resampled bits
    pub bits: BitMatrix,
    origin: Point,
    u: Point,
    n: Point,
}

impl Strip {
    /// Resample `width x height` pixels of `grid` along the basis `u`, `n`
    pub fn sample(grid: &dyn BinaryGrid, origin: Point, u: Point, n: Point, width: usize, height: usize) -> Self {
        let mut bits = BitMatrix::new(width, height);
        for j in 0..height {
            for i in 0..width {
                let p = origin
                    .add_scaled(&u, i as f32 + 0.5)
                    .add_scaled(&n, j as f32 + 0.5);
                if grid.get_signed(p.x.floor() as i64, p.y.floor() as i64) {
                    bits.set(i, j, true);
                }
            }
        }
        Self { bits, origin, u, n }
    }

    /// Strip point to source point
    pub fn to_source(&self, p: Point) -> Point {
        self.origin.add_scaled(&self.u, p.x).add_scaled(&self.n, p.y)
    }

    /// Source point to strip point
    pub fn from_source(&self, p: Point) -> Point {
        let d = Point::new(p.x - self.origin.x, p.y - self.origin.y);
        Point::new(d.dot(&self.u), d.dot(&self.n))
    }

    /// Strip width
    pub fn width(&self) -> usize {
        self.bits.width()
    }
}

/// Pixel box `[left, right) x [top, bottom)` inside a strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    /// First column
    pub left: i64,
    /// First row
    pub top: i64,
    /// One past the last column
    pub right: i64,
    /// One past the last row
    pub bottom: i64,
}

impl CropBox {
    /// Width in pixels
    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    /// Height in pixels
    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }

    /// Smallest box covering both
    pub fn union(&self, other: &CropBox) -> CropBox {
        CropBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// Best template for one crop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMatch {
    /// Index into [`GLYPHS`]
    pub glyph: usize,
    /// RMS error of the match
    pub error: f32,
    /// Crop after edge adaptation
    pub crop: CropBox,
}

/// Ink bounding box of columns `[x0, x1)` over the full strip height
pub fn ink_bbox(bits: &BitMatrix, x0: i64, x1: i64) -> Option<CropBox> {
    let x0 = x0.max(0) as usize;
    let x1 = (x1.max(0) as usize).min(bits.width());
    let mut found: Option<CropBox> = None;
    for y in 0..bits.height() {
        for x in x0..x1 {
            if !bits.get(x, y) {
                continue;
            }
            let pixel = CropBox {
                left: x as i64,
                top: y as i64,
                right: x as i64 + 1,
                bottom: y as i64 + 1,
            };
            found = Some(found.map_or(pixel, |b| b.union(&pixel)));
        }
    }
    found
}

/// Black fraction of a run of pixels
fn line_fill(bits: &BitMatrix, fixed: i64, from: i64, to: i64, vertical: bool) -> f32 {
    if to <= from {
        return 0.0;
    }
    let black = (from..to)
        .filter(|&v| {
            if vertical {
                bits.get_signed(fixed, v)
            } else {
                bits.get_signed(v, fixed)
            }
        })
        .count();
    black as f32 / (to - from) as f32
}

/// Slide each edge of `crop` by -2..=2 px toward the template's border level
fn adapt_crop(bits: &BitMatrix, crop: CropBox, template: &GlyphTemplate) -> CropBox {
    let best_offset = |observe: &dyn Fn(i64) -> f32, expected: f32| -> i64 {
        let mut best = (f32::MAX, 0i64);
        for d in -EDGE_SLACK..=EDGE_SLACK {
            let cost = (observe(d) - expected).abs() + EDGE_MOVE_COST * d.abs() as f32;
            if cost < best.0 {
                best = (cost, d);
            }
        }
        best.1
    };

    // offsets are outward-negative for left/top, outward-positive for right/bottom
    let left = best_offset(
        &|d| line_fill(bits, crop.left + d, crop.top, crop.bottom, true),
        template.border_level(0),
    );
    let top = best_offset(
        &|d| line_fill(bits, crop.top + d, crop.left, crop.right, false),
        template.border_level(1),
    );
    let right = best_offset(
        &|d| line_fill(bits, crop.right - 1 + d, crop.top, crop.bottom, true),
        template.border_level(2),
    );
    let bottom = best_offset(
        &|d| line_fill(bits, crop.bottom - 1 + d, crop.left, crop.right, false),
        template.border_level(3),
    );

    let adapted = CropBox {
        left: crop.left + left,
        top: crop.top + top,
        right: crop.right + right,
        bottom: crop.bottom + bottom,
    };
    if adapted.width() < 2 || adapted.height() < 2 {
        crop
    } else {
        adapted
    }
}

/// Black coverage of the fractional rectangle `[x0, x1) x [y0, y1)`
fn coverage(bits: &BitMatrix, x0: f32, y0: f32, x1: f32, y1: f32) -> f32 {
    let mut black = 0f32;
    let mut area = 0f32;
    let mut py = y0.floor();
    while py < y1 {
        let wy = (py + 1.0).min(y1) - py.max(y0);
        let mut px = x0.floor();
        while px < x1 {
            let wx = (px + 1.0).min(x1) - px.max(x0);
            let w = wx * wy;
            area += w;
            if bits.get_signed(px as i64, py as i64) {
                black += w;
            }
            px += 1.0;
        }
        py += 1.0;
    }
    if area > 0.0 { black / area } else { 0.0 }
}

/// RMS of `template/2 - overlap` over all template cells
pub fn template_error(bits: &BitMatrix, crop: CropBox, template: &GlyphTemplate) -> f32 {
    let (tw, th) = (template.width(), template.height());
    let cw = crop.width() as f32 / tw as f32;
    let ch = crop.height() as f32 / th as f32;
    let mut sum = 0f32;
    for ty in 0..th {
        let y0 = crop.top as f32 + ty as f32 * ch;
        for tx in 0..tw {
            let x0 = crop.left as f32 + tx as f32 * cw;
            let overlap = coverage(bits, x0, y0, x0 + cw, y0 + ch);
            let expected = template.weight(tx, ty) as f32 / 2.0;
            sum += (expected - overlap) * (expected - overlap);
        }
    }
    (sum / (tw * th) as f32).sqrt()
}

/// Lowest-error template for `crop`, if below [`ERROR_CEILING`]
pub fn match_glyph(bits: &BitMatrix, crop: CropBox) -> Option<GlyphMatch> {
    if crop.width() < 2 || crop.height() < 2 {
        return None;
    }
    let aspect = crop.width() as f32 / crop.height() as f32;
    let mut best: Option<GlyphMatch> = None;
    for (glyph, template) in GLYPHS.iter().enumerate() {
        let template_aspect = template.width() as f32 / template.height() as f32;
        let ratio = (aspect / template_aspect).max(template_aspect / aspect);
        if ratio > MAX_ASPECT_RATIO {
            continue;
        }
        let adapted = adapt_crop(bits, crop, template);
        let error = template_error(bits, adapted, template);
        if best.is_none_or(|b| error < b.error) {
            best = Some(GlyphMatch {
                glyph,
                error,
                crop: adapted,
            });
        }
    }
    let best = best?;
    trace!("best glyph {:?} error {:.3}", GLYPHS[best.glyph].symbol, best.error);
    (best.error < ERROR_CEILING).then_some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::micr::glyphs::GLYPH_COUNT;
    use crate::tools::synth::paint_glyph;

    fn rendered(glyph: usize, cell: usize) -> BitMatrix {
        let template = &GLYPHS[glyph];
        let w = template.width() * cell + 8;
        let h = template.height() * cell + 8;
        let mut bits = BitMatrix::new(w, h);
        paint_glyph(template, cell, 4, 4, &mut |x, y| bits.set(x, y, true));
        bits
    }

    #[test]
    fn test_every_glyph_matches_itself() {
        for glyph in 0..GLYPH_COUNT {
            let bits = rendered(glyph, 4);
            let crop = ink_bbox(&bits, 0, bits.width() as i64).unwrap();
            let found = match_glyph(&bits, crop).unwrap();
            assert_eq!(found.glyph, glyph, "glyph {}", GLYPHS[glyph].symbol);
            assert!(found.error < 0.05, "{} error {}", GLYPHS[glyph].symbol, found.error);
        }
    }

    #[test]
    fn test_blob_does_not_match() {
        let mut bits = BitMatrix::new(40, 40);
        for y in 2..38 {
            for x in 6..34 {
                bits.set(x, y, true);
            }
        }
        let crop = ink_bbox(&bits, 0, 40).unwrap();
        assert_eq!(match_glyph(&bits, crop), None);
    }

    #[test]
    fn test_strip_maps_back_to_source() {
        let mut grid = BitMatrix::new(50, 30);
        for y in 9..12 {
            for x in 19..22 {
                grid.set(x, y, true);
            }
        }
        let theta = 10f32.to_radians();
        let u = Point::new(theta.cos(), theta.sin());
        let n = Point::new(-theta.sin(), theta.cos());
        let strip = Strip::sample(&grid, Point::new(0.0, 0.0), u, n, 50, 30);
        let p = Point::new(20.5, 10.5);
        let back = strip.to_source(strip.from_source(p));
        assert!((back.x - p.x).abs() < 1e-4 && (back.y - p.y).abs() < 1e-4);
        let s = strip.from_source(p);
        assert!(strip.bits.get(s.x.floor() as usize, s.y.floor() as usize));
    }

    #[test]
    fn test_coverage_is_fractional() {
        let mut bits = BitMatrix::new(4, 1);
        bits.set(1, 0, true);
        assert!((coverage(&bits, 0.5, 0.0, 2.0, 1.0) - 1.0 / 1.5).abs() < 1e-6);
    }
}
