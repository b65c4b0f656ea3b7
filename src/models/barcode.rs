use serde::{Deserialize, Serialize};

use super::{Point, Rect};

/// Reports of one value this close together are the same symbol
pub const DUPLICATE_MARGIN: i32 = 5;

/// Symbologies the scanner can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarcodeFormat {
    /// EAN-13 (UPC-A is reported as EAN-13 with a leading zero)
    Ean13,
    /// E-13B MICR line
    Micr,
}

impl BarcodeFormat {
    /// Short display name
    pub fn name(&self) -> &'static str {
        match self {
            BarcodeFormat::Ean13 => "EAN-13",
            BarcodeFormat::Micr => "MICR",
        }
    }

    /// True for formats decoded row by row
    pub fn is_linear(&self) -> bool {
        matches!(self, BarcodeFormat::Ean13)
    }
}

/// Position of a symbol inside a structured-append sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureAppend {
    /// Zero-based index of this symbol
    pub index: u32,
    /// Number of symbols in the sequence
    pub count: u32,
}

/// A recognized symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundBarcode {
    /// Decoded text
    pub value: String,
    /// Symbol values as decoded (digits for EAN, glyph indices for MICR)
    pub raw_data: Vec<i32>,
    /// Bounding box in source-image coordinates
    pub rect: Rect,
    /// Closed outline in source-image coordinates (first == last)
    pub polygon: [Point; 5],
    /// Symbology
    pub format: BarcodeFormat,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f32,
    /// EAN-2/EAN-5 add-on, when one follows the main symbol
    pub supplement: Option<String>,
    /// Structured-append position, when the symbology carries one
    pub structure_append: Option<StructureAppend>,
}

impl FoundBarcode {
    /// Create a result whose polygon traces `rect`
    pub fn new(value: String, raw_data: Vec<i32>, rect: Rect, format: BarcodeFormat) -> Self {
        Self {
            value,
            raw_data,
            polygon: rect.polygon(),
            rect,
            format,
            confidence: 1.0,
            supplement: None,
            structure_append: None,
        }
    }

    /// Replace the polygon and recompute the bounding rect from it
    pub fn set_polygon(&mut self, polygon: [Point; 5]) {
        self.rect = Rect::bounding(&polygon[..4]);
        self.polygon = polygon;
    }

    /// True when `other` reports the same symbol at an overlapping or
    /// adjoining place (rects at most `DUPLICATE_MARGIN` px apart)
    pub fn is_duplicate_of(&self, other: &FoundBarcode) -> bool {
        self.format == other.format
            && self.value == other.value
            && self.rect.expanded(DUPLICATE_MARGIN).intersects(&other.rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_polygon_matches_rect() {
        let bc = FoundBarcode::new(
            "4006381333931".into(),
            vec![4, 0, 0, 6, 3, 8, 1, 3, 3, 3, 9, 3, 1],
            Rect::new(10, 20, 110, 40),
            BarcodeFormat::Ean13,
        );
        assert_eq!(bc.polygon[0], bc.polygon[4]);
        assert_eq!(Rect::bounding(&bc.polygon), bc.rect);
        assert_eq!(bc.format.name(), "EAN-13");
    }

    #[test]
    fn test_duplicate_detection() {
        let a = FoundBarcode::new("1".into(), vec![1], Rect::new(0, 0, 10, 10), BarcodeFormat::Micr);
        let mut b = a.clone();
        b.rect = Rect::new(5, 5, 20, 20);
        assert!(a.is_duplicate_of(&b));
        // touching and nearly touching fragments of one symbol
        b.rect = Rect::new(0, 10, 10, 12);
        assert!(a.is_duplicate_of(&b));
        b.rect = Rect::new(0, 14, 10, 20);
        assert!(a.is_duplicate_of(&b));
        b.rect = Rect::new(0, 16, 10, 20);
        assert!(!a.is_duplicate_of(&b));
        b.rect = Rect::new(50, 50, 60, 60);
        assert!(!a.is_duplicate_of(&b));
    }
}
