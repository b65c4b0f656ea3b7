use crate::decoder::RowDetection;
use crate::models::{BarcodeFormat, Rect};

/// Rows closer than this many pixels count as vertically adjacent
pub const MAX_ROW_GAP: usize = 5;
/// Largest confidence difference between rows of one symbol
const MAX_CONFIDENCE_DELTA: f32 = 0.1;
/// Left edges may drift by this fraction of the region width
const LEFT_EDGE_TOLERANCE: f32 = 0.2;

/// A symbol being assembled from consecutive row detections.
///
/// Coordinates are view columns and scan-row indices; `rect` always equals
/// the union of the row rectangles merged into it. Row distances are
/// compared in pixels, `step` pixels per scan row.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Longest value seen so far
    pub value: String,
    /// Raw symbol values of `value`
    pub raw: Vec<i32>,
    /// Add-on text, first one found
    pub supplement: Option<String>,
    /// Symbology
    pub format: BarcodeFormat,
    /// Blended confidence, the reported score
    pub confidence: f32,
    /// Mean of the per-row confidences, used for matching
    pub row_confidence: f32,
    /// Union of contributing row rectangles
    pub rect: Rect,
    /// Number of rows merged
    pub rows: usize,
    /// Last row that extended the region
    pub last_row: usize,
    /// Extended by the row currently being scanned
    pub extended: bool,
    /// Pixels between consecutive scan rows
    pub step: usize,
}

/// Rectangle covered by one detection on scan row `row`
pub fn row_rect(detection: &RowDetection, row: usize) -> Rect {
    Rect::new(
        detection.x_start as i32,
        row as i32,
        detection.x_end as i32,
        row as i32 + 1,
    )
}

impl Region {
    /// Region started by a single detection on scan row `row`
    pub fn new(detection: RowDetection, row: usize, step: usize) -> Self {
        Self {
            rect: row_rect(&detection, row),
            value: detection.value,
            raw: detection.raw,
            supplement: detection.supplement,
            format: detection.format,
            confidence: detection.confidence,
            row_confidence: detection.confidence,
            rows: 1,
            last_row: row,
            extended: true,
            step: step.max(1),
        }
    }

    /// True when `detection` on `row` continues this region
    pub fn matches(&self, detection: &RowDetection, row: usize) -> bool {
        let same_data = self.raw == detection.raw;
        let near = self.gap_pixels(row) < MAX_ROW_GAP;
        let aligned = (detection.x_start as f32 - self.rect.left as f32).abs()
            <= LEFT_EDGE_TOLERANCE * self.rect.width() as f32;
        (same_data || near)
            && self.format == detection.format
            && (self.row_confidence - detection.confidence).abs() < MAX_CONFIDENCE_DELTA
            && aligned
    }

    /// Fold `detection` into the region
    pub fn merge(&mut self, detection: RowDetection, row: usize) {
        self.rect = self.rect.union(&row_rect(&detection, row));
        let height = self.rows as f32;
        self.confidence =
            (1.0 + (self.confidence * height + detection.confidence) / (height + 1.0)) / 2.0;
        self.row_confidence = (self.row_confidence * height + detection.confidence) / (height + 1.0);
        if detection.value.len() > self.value.len() {
            self.value = detection.value;
            self.raw = detection.raw;
        }
        if self.supplement.is_none() {
            self.supplement = detection.supplement;
        }
        self.rows += 1;
        self.last_row = row;
        self.extended = true;
    }

    /// Pixels between the last merged row and scan row `row`
    fn gap_pixels(&self, row: usize) -> usize {
        row.saturating_sub(self.last_row) * self.step
    }

    /// True when scan row `row` ends the region: the row left it
    /// unextended and either yielded no candidates at all or lies
    /// `MAX_ROW_GAP` pixels past it
    pub fn is_closed_at(&self, row: usize, row_empty: bool) -> bool {
        !self.extended && (row_empty || self.gap_pixels(row) >= MAX_ROW_GAP)
    }
}
