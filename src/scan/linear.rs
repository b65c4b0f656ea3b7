//! Row-by-row scanning for 1D symbologies.
//!
//! Each pass walks the view's rows top to bottom (every `scan_step`-th row).
//! Detections that continue an open [`Region`] are merged into it. A row
//! that yields no candidates finalizes every open region at once; on rows
//! with candidates for other symbols, regions left behind by
//! [`MAX_ROW_GAP`](super::region::MAX_ROW_GAP) pixels are finalized. The
//! rest are reported when the pass ends.

use log::{debug, trace};

use super::consumer::{ResultSink, ScanControl};
use super::deadline::Deadline;
use super::region::Region;
use super::unrotate_polygon;
use crate::config::ScanConfig;
use crate::decoder::{RowDecoder, RowDetection};
use crate::error::Result;
use crate::models::{BitRow, FoundBarcode, Point, Rect};
use crate::view::RotatedView;

/// Open regions beyond this count are not started
const MAX_OPEN_REGIONS: usize = 64;

/// Result of scanning one view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOutcome {
    /// `Stop` when the consumer or `max_count` ended the scan
    pub control: ScanControl,
    /// Rows decoded over all passes
    pub rows_scanned: usize,
}

/// Mirror a detection decoded on a reversed row back into view columns
fn unmirror(mut detection: RowDetection, width: usize) -> RowDetection {
    let (start, end) = (detection.x_start, detection.x_end);
    detection.x_start = width.saturating_sub(end);
    detection.x_end = width.saturating_sub(start);
    detection
}

/// Turn a region into a result in source coordinates
fn finalize(region: Region, view: &RotatedView<'_>, step: usize) -> FoundBarcode {
    let rect = region.rect;
    let top = (rect.top as usize * step) as f32;
    let bottom = ((rect.bottom as usize - 1) * step + 1) as f32;
    let (left, right) = (rect.left as f32, rect.right as f32);
    let tl = Point::new(left, top);
    let polygon = [
        tl,
        Point::new(right, top),
        Point::new(right, bottom),
        Point::new(left, bottom),
        tl,
    ];
    let mut found = FoundBarcode::new(region.value, region.raw, Rect::default(), region.format);
    found.set_polygon(unrotate_polygon(view, &polygon));
    found.confidence = region.confidence;
    found.supplement = region.supplement;
    found
}

/// Report every region that is closed at `row` (all of them when `row` is
/// `None`); keeps the rest
fn flush(
    regions: &mut Vec<Region>,
    row: Option<(usize, bool)>,
    view: &RotatedView<'_>,
    step: usize,
    sink: &mut ResultSink<'_>,
) -> ScanControl {
    let mut control = ScanControl::Continue;
    let mut open = Vec::with_capacity(regions.len());
    for region in regions.drain(..) {
        let closed = row.is_none_or(|(r, empty)| region.is_closed_at(r, empty));
        if !closed || control == ScanControl::Stop {
            open.push(region);
            continue;
        }
        trace!("closing region {:?} after {} rows", region.value, region.rows);
        control = sink.report(finalize(region, view, step));
    }
    *regions = open;
    control
}

fn absorb(regions: &mut Vec<Region>, detection: RowDetection, row: usize, step: usize) {
    if let Some(i) = regions.iter().position(|r| r.matches(&detection, row)) {
        regions[i].merge(detection, row);
    } else if regions.len() < MAX_OPEN_REGIONS {
        regions.push(Region::new(detection, row, step));
    } else {
        trace!("region limit reached, dropping {:?}", detection.value);
    }
}

fn scan_pass(
    view: &RotatedView<'_>,
    decoders: &[&dyn RowDecoder],
    config: &ScanConfig,
    mirrored: bool,
    deadline: &Deadline,
    sink: &mut ResultSink<'_>,
) -> Result<(ScanControl, usize)> {
    let step = config.scan_step.max(1);
    let width = view.width();
    let rows = view.height().div_ceil(step);
    let mut regions: Vec<Region> = Vec::new();
    let mut reversed = BitRow::new(width);

    for i in 0..rows {
        deadline.check()?;
        let row = if mirrored {
            reversed.clone_from(view.row(i * step));
            reversed.reverse();
            &reversed
        } else {
            view.row(i * step)
        };

        for region in regions.iter_mut() {
            region.extended = false;
        }
        let mut candidates = 0usize;
        for decoder in decoders {
            for detection in decoder.decode_row(row, 0..width, sink.remaining()) {
                if detection.value.len() < config.min_value_length {
                    continue;
                }
                let detection = if mirrored {
                    unmirror(detection, width)
                } else {
                    detection
                };
                candidates += 1;
                absorb(&mut regions, detection, i, step);
            }
        }

        if flush(&mut regions, Some((i, candidates == 0)), view, step, sink) == ScanControl::Stop {
            return Ok((ScanControl::Stop, i + 1));
        }
    }

    let control = flush(&mut regions, None, view, step, sink);
    Ok((control, rows))
}

/// Scan `view` with every row decoder; a second, mirrored pass runs when
/// `config.mirrored` is set
pub fn scan_rows(
    view: &RotatedView<'_>,
    decoders: &[&dyn RowDecoder],
    config: &ScanConfig,
    deadline: &Deadline,
    sink: &mut ResultSink<'_>,
) -> Result<PassOutcome> {
    let mut outcome = PassOutcome {
        control: ScanControl::Continue,
        rows_scanned: 0,
    };
    if decoders.is_empty() || view.width() == 0 || view.height() == 0 {
        return Ok(outcome);
    }
    let passes: &[bool] = if config.mirrored { &[false, true] } else { &[false] };
    for &mirrored in passes {
        deadline.check()?;
        let before = sink.count();
        let (control, rows) = scan_pass(view, decoders, config, mirrored, deadline, sink)?;
        outcome.rows_scanned += rows;
        debug!(
            "{} pass at {} deg: {rows} rows, {} new",
            if mirrored { "mirrored" } else { "normal" },
            view.angle(),
            sink.count() - before
        );
        if control == ScanControl::Stop {
            outcome.control = ScanControl::Stop;
            break;
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binarizer::Binarizer;
    use crate::config::FilterKind;
    use crate::decoder::Ean13Decoder;
    use crate::models::{GrayImage, PixelSource};
    use crate::tools::synth::render_ean13;

    fn run(image: &GrayImage, config: &ScanConfig) -> (Vec<FoundBarcode>, PassOutcome) {
        let view = RotatedView::direct(Binarizer::new(image, FilterKind::Fixed, config));
        let decoder = Ean13Decoder::default();
        let mut found: Vec<FoundBarcode> = Vec::new();
        let mut sink = ResultSink::new(&mut found, config.max_count);
        let outcome =
            scan_rows(&view, &[&decoder], config, &Deadline::unlimited(), &mut sink).unwrap();
        (found, outcome)
    }

    #[test]
    fn test_rows_merge_into_one_symbol() {
        let image = render_ean13("5901234123457", None, 2, 40).unwrap();
        let (found, outcome) = run(&image, &ScanConfig::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "5901234123457");
        assert_eq!(found[0].rect, Rect::new(24, 10, 214, 50));
        assert_eq!(outcome.rows_scanned, 60);
        assert_eq!(outcome.control, ScanControl::Continue);
    }

    #[test]
    fn test_scan_step_scales_rows_back() {
        let image = render_ean13("5901234123457", None, 2, 40).unwrap();
        let config = ScanConfig {
            scan_step: 3,
            ..Default::default()
        };
        let (found, outcome) = run(&image, &config);
        assert_eq!(found.len(), 1);
        assert_eq!((found[0].rect.top, found[0].rect.bottom), (12, 49));
        assert_eq!(outcome.rows_scanned, 20);
    }

    #[test]
    fn test_mirrored_pass_finds_reversed_symbol() {
        let image = render_ean13("4006381333931", None, 2, 30).unwrap();
        let mut flipped = GrayImage::filled(image.width(), image.height(), 255);
        for y in 0..image.height() {
            for x in 0..image.width() {
                flipped.set(image.width() - 1 - x, y, image.pixel(x, y));
            }
        }
        let (found, _) = run(&flipped, &ScanConfig::default());
        assert!(found.is_empty());

        let config = ScanConfig {
            mirrored: true,
            ..Default::default()
        };
        let (found, outcome) = run(&flipped, &config);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "4006381333931");
        assert_eq!((found[0].rect.left, found[0].rect.right), (24, 214));
        assert_eq!(outcome.rows_scanned, 100);
    }

    #[test]
    fn test_quarter_view_reports_source_coordinates() {
        let image = render_ean13("5901234123457", None, 2, 40).unwrap();
        // transpose so the bars run horizontally
        let mut turned = GrayImage::filled(image.height(), image.width(), 255);
        for y in 0..image.height() {
            for x in 0..image.width() {
                turned.set(y, x, image.pixel(x, y));
            }
        }
        let config = ScanConfig::default();
        let base = RotatedView::direct(Binarizer::new(&turned, FilterKind::Fixed, &config));
        let view = RotatedView::quarter(&base);
        let decoder = Ean13Decoder::default();
        let mut found: Vec<FoundBarcode> = Vec::new();
        let mut sink = ResultSink::new(&mut found, 8);
        scan_rows(&view, &[&decoder], &config, &Deadline::unlimited(), &mut sink).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rect, Rect::new(10, 24, 50, 214));
    }

    #[test]
    fn test_expired_deadline_is_an_error() {
        let image = render_ean13("5901234123457", None, 2, 40).unwrap();
        let config = ScanConfig::default();
        let view = RotatedView::direct(Binarizer::new(&image, FilterKind::Fixed, &config));
        let decoder = Ean13Decoder::default();
        let mut found: Vec<FoundBarcode> = Vec::new();
        let mut sink = ResultSink::new(&mut found, 8);
        let result = scan_rows(&view, &[&decoder], &config, &Deadline::expired(), &mut sink);
        assert!(matches!(result, Err(crate::ScanError::Timeout { .. })));
        assert!(found.is_empty());
    }

    /// Reports one fixed symbol on every row whose first pixel is black
    struct MarkedRows(f32);

    impl RowDecoder for MarkedRows {
        fn format(&self) -> crate::models::BarcodeFormat {
            crate::models::BarcodeFormat::Ean13
        }

        fn decode_row(&self, row: &BitRow, _: std::ops::Range<usize>, _: usize) -> Vec<RowDetection> {
            if !row.get(0) {
                return Vec::new();
            }
            vec![RowDetection {
                value: "4006381333931".into(),
                raw: vec![4, 0, 0, 6, 3, 8, 1, 3, 3, 3, 9, 3, 1],
                x_start: 10,
                x_end: 90,
                format: crate::models::BarcodeFormat::Ean13,
                confidence: self.0,
                supplement: None,
            }]
        }
    }

    fn marked_page(rows: impl IntoIterator<Item = usize>) -> GrayImage {
        let mut image = GrayImage::filled(100, 60, 255);
        for y in rows {
            image.set(0, y, 0);
        }
        image
    }

    fn scan_marked(
        image: &GrayImage,
        confidence: f32,
        consumer: &mut dyn crate::scan::BarcodeConsumer,
    ) -> PassOutcome {
        let config = ScanConfig::default();
        let view = RotatedView::direct(Binarizer::new(image, FilterKind::Fixed, &config));
        let decoder = MarkedRows(confidence);
        let mut sink = ResultSink::new(consumer, config.max_count);
        scan_rows(&view, &[&decoder], &config, &Deadline::unlimited(), &mut sink).unwrap()
    }

    #[test]
    fn test_low_confidence_symbol_is_reported_once() {
        let image = marked_page(10..40);
        let mut found: Vec<FoundBarcode> = Vec::new();
        scan_marked(&image, 0.7, &mut found);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rect, Rect::new(10, 10, 90, 40));
        assert!(found[0].confidence > 0.7);
    }

    #[test]
    fn test_empty_row_closes_region_at_once() {
        let image = marked_page(10..20);
        let mut seen = 0usize;
        let mut stop_at_first = |_: &FoundBarcode| {
            seen += 1;
            ScanControl::Stop
        };
        let outcome = scan_marked(&image, 1.0, &mut stop_at_first);
        assert_eq!(seen, 1);
        assert_eq!(outcome.control, ScanControl::Stop);
        // rows 0..=20 decoded, row 20 being the first empty one
        assert_eq!(outcome.rows_scanned, 21);
    }

    #[test]
    fn test_failed_row_inside_symbol_is_not_reported_twice() {
        let image = marked_page((10..20).chain(21..30));
        let mut found: Vec<FoundBarcode> = Vec::new();
        let outcome = scan_marked(&image, 0.9, &mut found);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rect, Rect::new(10, 10, 90, 20));
        assert_eq!(outcome.rows_scanned, 60);
    }

    #[test]
    fn test_unmirror_maps_columns() {
        let detection = RowDetection {
            value: "1".into(),
            raw: vec![1],
            x_start: 10,
            x_end: 30,
            format: crate::models::BarcodeFormat::Ean13,
            confidence: 1.0,
            supplement: None,
        };
        let back = unmirror(detection, 100);
        assert_eq!((back.x_start, back.x_end), (70, 90));
    }
}
