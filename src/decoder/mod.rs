//! Symbology decoders
//!
//! Row decoders turn one binarized row into zero or more detections; the
//! 1D scan engine stitches detections from consecutive rows together.
//! - EAN-13 with optional EAN-2/EAN-5 add-ons
//! - Module tables shared by the EAN family

use std::ops::Range;

use crate::models::{BarcodeFormat, BitRow};

/// EAN-13 row decoder
pub mod ean13;
/// EAN-2 and EAN-5 add-ons
pub mod extension;
/// EAN module and parity tables
pub mod tables;

pub use ean13::Ean13Decoder;

/// One symbol found on one row
#[derive(Debug, Clone, PartialEq)]
pub struct RowDetection {
    /// Decoded text
    pub value: String,
    /// Symbol values behind `value`
    pub raw: Vec<i32>,
    /// First column of the symbol (start guard)
    pub x_start: usize,
    /// Column just past the end guard
    pub x_end: usize,
    /// Symbology
    pub format: BarcodeFormat,
    /// Match quality in 0..=1
    pub confidence: f32,
    /// Add-on text
    pub supplement: Option<String>,
}

/// A symbology that can be read from a single row
pub trait RowDecoder: Send + Sync {
    /// Symbology produced by this decoder
    fn format(&self) -> BarcodeFormat;

    /// Decode up to `max_results` symbols lying within `range` of `row`
    fn decode_row(&self, row: &BitRow, range: Range<usize>, max_results: usize) -> Vec<RowDetection>;
}
