//! E-13B MICR line recognition.
//!
//! Ink components are sliced out of the binary view, their centers vote for
//! lines in a Hough accumulator, and each strong cell is split into evenly
//! pitched runs that are read with template OCR.

/// Runs of evenly pitched segments along a Hough line
pub mod cluster;
/// E-13B glyph templates
pub mod glyphs;
/// Hough voting of segment centers
pub mod hough;
/// Reading one candidate line into a MICR result
pub mod line;
/// Strip resampling and template matching
pub mod ocr;
/// Connected ink components
pub mod slicer;

use std::collections::HashSet;

use log::debug;

use crate::config::MicrConfig;
use crate::error::Result;
use crate::models::{BarcodeFormat, FoundBarcode, Point, Rect};
use crate::scan::{Deadline, ImageDecoder};
use crate::view::RotatedView;

pub use line::{MicrLine, RAW_SPACE, RAW_UNKNOWN};

/// Whole-image MICR decoder
#[derive(Debug, Clone, Default)]
pub struct MicrDecoder {
    config: MicrConfig,
}

impl MicrDecoder {
    /// Decoder with the given tuning
    pub fn new(config: MicrConfig) -> Self {
        Self { config }
    }

    /// Every line found in `view`, in view coordinates
    pub fn read_lines(&self, view: &RotatedView<'_>, deadline: &Deadline) -> Result<Vec<MicrLine>> {
        let cfg = &self.config;
        let mut segments = slicer::slice(view, cfg.min_radius, cfg.max_radius);
        let quantum = hough::distance_quantum(&segments);
        let cells = hough::vote(&segments, cfg.max_skew_degrees, quantum);

        let mut fixed_skew: Option<i32> = None;
        let mut tried: HashSet<Vec<usize>> = HashSet::new();
        let mut lines = Vec::new();

        for cell in &cells {
            if !cell.reaches(cfg.min_line_segments) {
                break;
            }
            deadline.check()?;
            if !hough::angle_consistent(cell.angle, fixed_skew) {
                continue;
            }
            let members: Vec<usize> = cell
                .segments
                .iter()
                .copied()
                .filter(|&i| !segments[i].scanned)
                .collect();
            if members.len() < cfg.min_line_segments || !tried.insert(members.clone()) {
                continue;
            }

            let degrees = cell.angle as f32;
            let runs = cluster::build_runs(&segments, &members, degrees);
            for candidate in cluster::join_runs(runs) {
                if candidate.members.iter().any(|&i| segments[i].scanned) {
                    continue;
                }
                let Some(found) = line::read_line(view, &segments, &candidate, degrees, cfg) else {
                    continue;
                };
                for segment in segments.iter_mut() {
                    let c = segment.center();
                    if found.covers(Point::new(c.x + 0.5, c.y + 0.5)) {
                        segment.scanned = true;
                    }
                }
                for &i in &candidate.members {
                    segments[i].scanned = true;
                }
                if fixed_skew.is_none() {
                    debug!("micr skew fixed at {} deg", cell.angle);
                    fixed_skew = Some(cell.angle);
                }
                lines.push(found);
            }
        }
        Ok(lines)
    }
}

impl ImageDecoder for MicrDecoder {
    fn format(&self) -> BarcodeFormat {
        BarcodeFormat::Micr
    }

    fn decode_image(&self, view: &RotatedView<'_>, deadline: &Deadline) -> Result<Vec<FoundBarcode>> {
        let lines = self.read_lines(view, deadline)?;
        Ok(lines
            .into_iter()
            .map(|line| {
                let mut found = FoundBarcode::new(line.value, line.raw, Rect::default(), BarcodeFormat::Micr);
                found.set_polygon(line.polygon);
                found.confidence = line.confidence;
                found
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binarizer::Binarizer;
    use crate::config::{FilterKind, ScanConfig};
    use crate::models::GrayImage;
    use crate::tools::synth::render_micr_line;

    fn decode(image: &GrayImage) -> Vec<MicrLine> {
        let config = ScanConfig::default();
        let view = RotatedView::direct(Binarizer::new(image, FilterKind::Fixed, &config));
        MicrDecoder::default()
            .read_lines(&view, &Deadline::unlimited())
            .unwrap()
    }

    #[test]
    fn test_reads_synthetic_line() {
        let image = render_micr_line("A021000021A 1234567C", 4);
        let lines = decode(&image);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].value, "A021000021A 1234567C");
        assert!(lines[0].angle.abs() <= 1.0);
    }

    #[test]
    fn test_blank_page_has_no_lines() {
        let image = GrayImage::filled(200, 80, 255);
        assert!(decode(&image).is_empty());
    }

    #[test]
    fn test_expired_deadline_stops_decoding() {
        let image = render_micr_line("0123456789", 4);
        let base = RotatedView::direct(Binarizer::new(&image, FilterKind::Fixed, &ScanConfig::default()));
        let result = MicrDecoder::default().read_lines(&base, &Deadline::expired());
        assert!(matches!(result, Err(crate::ScanError::Timeout { .. })));
    }
}
