//! Reading one candidate line: strip resampling, per-slot OCR, gap filling
//! and outward extension.

use log::{debug, trace};

use super::cluster::{LineCandidate, direction};
use super::glyphs::GLYPHS;
use super::ocr::{CropBox, ERROR_CEILING, Strip, ink_bbox, match_glyph};
use crate::config::MicrConfig;
use crate::models::{BinaryGrid, Point, Segment};

/// Gaps wider than this many pitches get intermediate slots
const GAP_FILL_PITCHES: f32 = 1.2;
/// Extra strip height around the line, as a fraction of the glyph height
const STRIP_MARGIN: f32 = 0.75;
/// How far the strip reaches beyond the outermost members, in pitches
const MAX_EXTENSION_PITCHES: f32 = 40.0;
/// Shortest run of inked symbols for a line to count
const MIN_SYMBOL_RUN: usize = 3;

/// Raw value of an inked slot that matches no glyph
pub const RAW_UNKNOWN: i32 = -1;
/// Raw value of a blank slot
pub const RAW_SPACE: i32 = -2;

#[derive(Debug, Clone, Copy, PartialEq)]
enum SlotKind {
    Glyph { glyph: usize, error: f32 },
    Unknown,
    Space,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    center: f32,
    kind: SlotKind,
    ink: Option<CropBox>,
}

/// A recognized MICR line
#[derive(Debug, Clone, PartialEq)]
pub struct MicrLine {
    /// Text with placeholders for unknown and blank slots
    pub value: String,
    /// Glyph index per slot, [`RAW_UNKNOWN`] or [`RAW_SPACE`]
    pub raw: Vec<i32>,
    /// Ink outline in source coordinates, closed
    pub polygon: [Point; 5],
    /// Mean match quality scaled by the share of matched slots
    pub confidence: f32,
    /// Line angle in degrees
    pub angle: f32,
    strip: Strip,
    extent: CropBox,
}

impl MicrLine {
    /// True when the source point `p` lies inside the line's ink box
    pub fn covers(&self, p: Point) -> bool {
        let s = self.strip.from_source(p);
        s.x >= self.extent.left as f32
            && s.x <= self.extent.right as f32
            && s.y >= self.extent.top as f32
            && s.y <= self.extent.bottom as f32
    }

    /// Number of slots holding a recognized glyph
    pub fn matched(&self) -> usize {
        self.raw.iter().filter(|&&r| r >= 0).count()
    }
}

/// Continuous center of a segment's box
fn segment_center(segment: &Segment) -> Point {
    let c = segment.center();
    Point::new(c.x + 0.5, c.y + 0.5)
}

/// Resample a strip around `line` wide enough for outward extension
fn line_strip(grid: &dyn BinaryGrid, segments: &[Segment], line: &LineCandidate, degrees: f32) -> Strip {
    let u = direction(degrees);
    let n = Point::new(-u.y, u.x);
    let centers: Vec<Point> = line.members.iter().map(|&i| segment_center(&segments[i])).collect();
    let t0 = centers.iter().map(|c| c.dot(&n)).sum::<f32>() / centers.len().max(1) as f32;
    let s_first = centers.iter().map(|c| c.dot(&u)).fold(f32::MAX, f32::min);
    let s_last = centers.iter().map(|c| c.dot(&u)).fold(f32::MIN, f32::max);

    // along-line extent of the whole grid
    let (w, h) = (grid.width() as f32, grid.height() as f32);
    let corners = [
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(0.0, h),
        Point::new(w, h),
    ];
    let grid_lo = corners.iter().map(|c| c.dot(&u)).fold(f32::MAX, f32::min);
    let grid_hi = corners.iter().map(|c| c.dot(&u)).fold(f32::MIN, f32::max);
    let reach = MAX_EXTENSION_PITCHES * line.pitch;
    let s_lo = (s_first - reach).max(grid_lo);
    let s_hi = (s_last + reach).min(grid_hi);

    let half = STRIP_MARGIN * line.height + 2.0;
    let strip_width = (s_hi - s_lo).ceil().max(1.0) as usize + 1;
    let strip_height = (2.0 * half).ceil() as usize;
    let origin = Point::new(u.x * s_lo, u.y * s_lo).add_scaled(&n, t0 - half);
    let origin = Point::new(origin.x.round(), origin.y.round());
    Strip::sample(grid, origin, u, n, strip_width, strip_height)
}

fn read_slot(strip: &Strip, center: f32, pitch: f32) -> Slot {
    let x0 = (center - pitch / 2.0).round() as i64;
    let x1 = (center + pitch / 2.0).round() as i64;
    let Some(ink) = ink_bbox(&strip.bits, x0, x1) else {
        return Slot {
            center,
            kind: SlotKind::Space,
            ink: None,
        };
    };
    match match_glyph(&strip.bits, ink) {
        Some(m) => Slot {
            center,
            kind: SlotKind::Glyph {
                glyph: m.glyph,
                error: m.error,
            },
            ink: Some(m.crop),
        },
        None => Slot {
            center,
            kind: SlotKind::Unknown,
            ink: Some(ink),
        },
    }
}

fn fill_gaps(strip: &Strip, slots: Vec<Slot>, pitch: f32) -> Vec<Slot> {
    let mut filled: Vec<Slot> = Vec::with_capacity(slots.len());
    for slot in slots {
        if let Some(prev) = filled.last().copied() {
            let d = slot.center - prev.center;
            if d > GAP_FILL_PITCHES * pitch {
                let missing = (d / pitch).round() as i64 - 1;
                let step = d / (missing + 1) as f32;
                for k in 1..=missing.max(0) {
                    filled.push(read_slot(strip, prev.center + k as f32 * step, pitch));
                }
            }
        }
        filled.push(slot);
    }
    filled
}

fn extend(strip: &Strip, slots: &mut Vec<Slot>, pitch: f32) {
    let limit = strip.width() as f32;
    let mut added = Vec::new();
    let Some(first) = slots.first().map(|s| s.center) else {
        return;
    };
    let mut c = first - pitch;
    while c - pitch / 2.0 >= 0.0 {
        let slot = read_slot(strip, c, pitch);
        if !matches!(slot.kind, SlotKind::Glyph { .. }) {
            break;
        }
        added.push(slot);
        c -= pitch;
    }
    added.reverse();
    added.append(slots);
    *slots = added;

    let Some(last) = slots.last().map(|s| s.center) else {
        return;
    };
    let mut c = last + pitch;
    while c + pitch / 2.0 <= limit {
        let slot = read_slot(strip, c, pitch);
        if !matches!(slot.kind, SlotKind::Glyph { .. }) {
            break;
        }
        slots.push(slot);
        c += pitch;
    }
}

fn longest_inked_run(slots: &[Slot]) -> usize {
    let mut best = 0;
    let mut current = 0;
    for slot in slots {
        if slot.kind == SlotKind::Space {
            current = 0;
        } else {
            current += 1;
            best = best.max(current);
        }
    }
    best
}

/// Read the line `line` of `grid`; `None` when too few symbols are recognized
pub fn read_line(
    grid: &dyn BinaryGrid,
    segments: &[Segment],
    line: &LineCandidate,
    degrees: f32,
    config: &MicrConfig,
) -> Option<MicrLine> {
    if line.members.is_empty() || line.pitch <= 0.0 {
        return None;
    }
    let strip = line_strip(grid, segments, line, degrees);
    let mut slots: Vec<Slot> = line
        .members
        .iter()
        .map(|&i| {
            let center = strip.from_source(segment_center(&segments[i])).x;
            read_slot(&strip, center, line.pitch)
        })
        .collect();
    slots.sort_by(|a, b| a.center.total_cmp(&b.center));
    slots.dedup_by(|b, a| (b.center - a.center).abs() < 0.5 * line.pitch);

    let mut slots = fill_gaps(&strip, slots, line.pitch);
    extend(&strip, &mut slots, line.pitch);

    let matched: Vec<f32> = slots
        .iter()
        .filter_map(|s| match s.kind {
            SlotKind::Glyph { error, .. } => Some(error),
            _ => None,
        })
        .collect();
    let run = longest_inked_run(&slots);
    trace!(
        "line at {degrees} deg: {} slots, {} matched, longest run {run}",
        slots.len(),
        matched.len()
    );
    if run < MIN_SYMBOL_RUN || matched.len() <= config.min_digits {
        return None;
    }

    let mut value = String::with_capacity(slots.len());
    let mut raw = Vec::with_capacity(slots.len());
    let mut extent: Option<CropBox> = None;
    let mut unknown = 0usize;
    for slot in &slots {
        match slot.kind {
            SlotKind::Glyph { glyph, .. } => {
                value.push(GLYPHS[glyph].symbol);
                raw.push(glyph as i32);
            }
            SlotKind::Unknown => {
                value.push(config.unknown_char);
                raw.push(RAW_UNKNOWN);
                unknown += 1;
            }
            SlotKind::Space => {
                value.push(config.space_char);
                raw.push(RAW_SPACE);
            }
        }
        if let Some(ink) = slot.ink {
            extent = Some(extent.map_or(ink, |e| e.union(&ink)));
        }
    }
    let extent = extent?;

    let mean_error = matched.iter().sum::<f32>() / matched.len() as f32;
    let share = matched.len() as f32 / (matched.len() + unknown) as f32;
    let confidence = ((1.0 - mean_error / ERROR_CEILING) * share).clamp(0.0, 1.0);

    let corner = |x: i64, y: i64| strip.to_source(Point::new(x as f32, y as f32));
    let tl = corner(extent.left, extent.top);
    let polygon = [
        tl,
        corner(extent.right, extent.top),
        corner(extent.right, extent.bottom),
        corner(extent.left, extent.bottom),
        tl,
    ];
    debug!("micr line {value:?} confidence {confidence:.2}");

    Some(MicrLine {
        value,
        raw,
        polygon,
        confidence,
        angle: degrees,
        strip,
        extent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::micr::cluster::{build_runs, join_runs};
    use crate::micr::slicer::slice;
    use crate::models::BitMatrix;
    use crate::tools::synth::paint_micr_line;

    fn page(text: &str, cell: usize) -> BitMatrix {
        let mut bits = BitMatrix::new(40 + text.len() * 9 * cell, 20 * cell);
        paint_micr_line(text, cell, 20, 5 * cell, &mut |x, y| bits.set(x, y, true));
        bits
    }

    fn read(bits: &BitMatrix) -> Option<MicrLine> {
        let segments = slice(bits, 4.0, 60.0);
        let members: Vec<usize> = (0..segments.len()).collect();
        let lines = join_runs(build_runs(&segments, &members, 0.0));
        let line = lines.iter().max_by_key(|l| l.members.len())?;
        read_line(bits, &segments, line, 0.0, &MicrConfig::default())
    }

    #[test]
    fn test_reads_digits_with_spaces() {
        let bits = page("0123 456789", 4);
        let line = read(&bits).unwrap();
        assert_eq!(line.value, "0123 456789");
        assert_eq!(line.raw[4], RAW_SPACE);
        assert_eq!(line.raw[0], 0);
        assert_eq!(line.matched(), 10);
        assert!(line.confidence > 0.8);
    }

    #[test]
    fn test_special_symbols_found_by_extension() {
        let bits = page("A12345678A", 4);
        let line = read(&bits).unwrap();
        assert_eq!(line.value, "A12345678A");
        assert_eq!(line.raw[0], crate::micr::glyphs::TRANSIT as i32);
    }

    #[test]
    fn test_too_few_symbols_rejected() {
        let bits = page("123", 4);
        assert!(read(&bits).is_none());
    }

    #[test]
    fn test_polygon_covers_ink() {
        let bits = page("55555", 4);
        let line = read(&bits).unwrap();
        let rect = crate::models::Rect::bounding(&line.polygon[..4]);
        // first glyph starts 4 px into its slot
        assert_eq!((rect.left, rect.top), (24, 20));
        assert_eq!(rect.bottom, 56);
        assert!(line.covers(Point::new(30.0, 30.0)));
        assert!(!line.covers(Point::new(30.0, 2.0)));
    }
}
