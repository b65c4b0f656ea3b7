//! Scan engines
//!
//! The linear engine walks view rows through row decoders and stitches
//! detections into regions; the matrix engine hands whole views to image
//! decoders. Both report through one deduplicating [`ResultSink`] and stop
//! at the shared [`Deadline`].

/// Consumer callback and result sink
pub mod consumer;
/// Cooperative timeout
pub mod deadline;
/// Row-by-row engine for 1D symbologies
pub mod linear;
/// Whole-view engine for 2D recognizers
pub mod matrix;
/// Module-width matching helpers
pub mod pattern;
/// Multi-row symbol assembly
pub mod region;

pub use consumer::{BarcodeConsumer, ResultSink, ScanControl};
pub use deadline::Deadline;
pub use linear::{PassOutcome, scan_rows};
pub use matrix::{ImageDecoder, scan_image};

use crate::models::Point;
use crate::view::RotatedView;

/// Map view points to source coordinates, rounded to 1e-3 so exact pixel
/// edges do not pick up float noise
pub(crate) fn unrotate_polygon(view: &RotatedView<'_>, polygon: &[Point; 5]) -> [Point; 5] {
    polygon.map(|p| {
        let q = view.unrotate(p);
        Point::new((q.x * 1e3).round() / 1e3, (q.y * 1e3).round() / 1e3)
    })
}
