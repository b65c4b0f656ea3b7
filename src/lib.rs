//! rust_barcode - barcode and MICR line recognition in pure Rust
//!
//! Images are binarized with one of several interchangeable filters, viewed
//! at the configured rotations, and scanned by two engines: a row scanner
//! for 1D symbologies (EAN-13 with EAN-2/EAN-5 add-ons) and a whole-image
//! recognizer for E-13B MICR lines. Results are reported in source-image
//! coordinates, either as a batch or one by one through a consumer.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Binarization filters and the cached binarizer
pub mod binarizer;
/// Scan configuration
pub mod config;
/// Row decoders for 1D symbologies
pub mod decoder;
/// Crate error type
pub mod error;
/// Stderr logger for binaries
pub mod logger;
/// E-13B MICR line recognition
pub mod micr;
/// Core data structures (BitRow, BitMatrix, FoundBarcode, etc.)
pub mod models;
/// Scan engines, consumer and deadline
pub mod scan;
/// Dataset, image loading and synthetic rendering helpers
pub mod tools;
/// Utility functions (grayscale, fixed point, integral images)
pub mod utils;
/// Rotated views over a binarized image
pub mod view;

pub use config::{FilterKind, MicrConfig, ScanConfig};
pub use error::{Result, ScanError};
pub use models::{BarcodeFormat, FoundBarcode, GrayImage, PixelSource, Point, Rect};
pub use scan::{BarcodeConsumer, Deadline, ScanControl};

use log::debug;

use binarizer::Binarizer;
use decoder::{Ean13Decoder, RowDecoder};
use micr::MicrDecoder;
use scan::{ImageDecoder, ResultSink};
use view::RotatedView;

/// What one [`Scanner::scan`] call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSummary {
    /// Distinct symbols handed to the consumer
    pub reported: usize,
    /// Rows decoded over every filter, angle and pass
    pub rows_scanned: usize,
    /// The consumer or `max_count` ended the scan
    pub stopped_early: bool,
}

/// Configured scanner; cheap to keep around and reuse across images
#[derive(Debug, Clone)]
pub struct Scanner {
    config: ScanConfig,
    ean13: Ean13Decoder,
    micr: MicrDecoder,
}

impl Default for Scanner {
    fn default() -> Self {
        let config = ScanConfig::default();
        Self {
            ean13: Ean13Decoder::new(config.quiet_zone),
            micr: MicrDecoder::new(config.micr.clone()),
            config,
        }
    }
}

impl Scanner {
    /// Scanner for `config`, after validating it
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ean13: Ean13Decoder::new(config.quiet_zone),
            micr: MicrDecoder::new(config.micr.clone()),
            config,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Every symbol in `source`
    pub fn decode(&self, source: &dyn PixelSource) -> Result<Vec<FoundBarcode>> {
        let mut found: Vec<FoundBarcode> = Vec::new();
        self.scan(source, &mut found)?;
        Ok(found)
    }

    /// Report symbols to `consumer` as soon as each is finalized.
    ///
    /// The primary filter always runs; each fallback filter runs only while
    /// fewer than `min_count` symbols have been reported. A timeout returns
    /// `Err(ScanError::Timeout)` after whatever was already reported.
    pub fn scan(&self, source: &dyn PixelSource, consumer: &mut dyn BarcodeConsumer) -> Result<ScanSummary> {
        let (width, height) = (source.width(), source.height());
        if width == 0 || height == 0 {
            return Err(ScanError::EmptyImage { width, height });
        }
        let config = &self.config;
        let deadline = Deadline::new(config.timeout_ms);
        let mut sink = ResultSink::new(consumer, config.max_count);
        let mut summary = ScanSummary::default();

        let mut row_decoders: Vec<&dyn RowDecoder> = Vec::new();
        if config.wants(BarcodeFormat::Ean13) {
            row_decoders.push(&self.ean13);
        }
        let mut image_decoders: Vec<&dyn ImageDecoder> = Vec::new();
        if config.wants(BarcodeFormat::Micr) {
            image_decoders.push(&self.micr);
        }

        let mut tried: Vec<FilterKind> = Vec::new();
        let filters = std::iter::once(config.filter).chain(config.fallback_filters.iter().copied());
        for kind in filters {
            if tried.contains(&kind) {
                continue;
            }
            if !tried.is_empty() && sink.count() >= config.min_count {
                break;
            }
            tried.push(kind);
            debug!("scanning {width}x{height} with {kind:?} filter");

            let base = RotatedView::direct(Binarizer::new(source, kind, config));
            for &angle in &config.angles {
                deadline.check()?;
                let rotated;
                let view = if angle.rem_euclid(360.0) == 0.0 {
                    &base
                } else {
                    rotated = RotatedView::rotated(&base, angle);
                    &rotated
                };

                let outcome = scan::scan_rows(view, &row_decoders, config, &deadline, &mut sink)?;
                summary.rows_scanned += outcome.rows_scanned;
                let control = match outcome.control {
                    ScanControl::Stop => ScanControl::Stop,
                    ScanControl::Continue => {
                        scan::scan_image(view, &image_decoders, config, &deadline, &mut sink)?
                    }
                };
                if control == ScanControl::Stop {
                    summary.stopped_early = true;
                    summary.reported = sink.count();
                    return Ok(summary);
                }
            }
        }

        summary.reported = sink.count();
        Ok(summary)
    }
}

/// Detect symbols in an RGB image with the default configuration
///
/// # Arguments
/// * `image` - Raw RGB bytes (3 bytes per pixel)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
pub fn detect(image: &[u8], width: usize, height: usize) -> Result<Vec<FoundBarcode>> {
    let gray = GrayImage::from_rgb(image, width, height)?;
    Scanner::default().decode(&gray)
}

/// Detect symbols in an 8-bit grayscale image with the default configuration
pub fn detect_from_grayscale(image: &[u8], width: usize, height: usize) -> Result<Vec<FoundBarcode>> {
    let gray = GrayImage::new(width, height, image.to_vec())?;
    Scanner::default().decode(&gray)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_blank() {
        let image = vec![255u8; 300]; // 10x10 RGB
        let codes = detect(&image, 10, 10).unwrap();
        assert!(codes.is_empty());
    }

    #[test]
    fn test_detect_rejects_bad_buffers() {
        assert!(matches!(
            detect(&[0u8; 10], 10, 10),
            Err(ScanError::BufferSize { expected: 300, actual: 10 })
        ));
        assert!(matches!(
            detect_from_grayscale(&[], 0, 4),
            Err(ScanError::EmptyImage { width: 0, height: 4 })
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ScanConfig {
            scan_step: 0,
            ..Default::default()
        };
        assert!(matches!(Scanner::new(config), Err(ScanError::InvalidConfig(_))));
    }

    #[test]
    fn test_fallback_runs_only_when_needed() {
        let image = tools::synth::render_ean13("4006381333931", None, 2, 30).unwrap();
        let config = ScanConfig {
            filter: FilterKind::Fixed,
            fallback_filters: vec![FilterKind::Histogram, FilterKind::Block],
            formats: vec![BarcodeFormat::Ean13],
            ..Default::default()
        };
        let scanner = Scanner::new(config).unwrap();
        let mut found: Vec<FoundBarcode> = Vec::new();
        let summary = scanner.scan(&image, &mut found).unwrap();
        assert_eq!(found.len(), 1);
        // one filter, one angle, one pass
        assert_eq!(summary.rows_scanned, image.height());
        assert!(!summary.stopped_early);
    }
}
