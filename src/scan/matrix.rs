//! Whole-view scanning for recognizers that need the full image at once.

use log::debug;

use super::consumer::{ResultSink, ScanControl};
use super::deadline::Deadline;
use super::unrotate_polygon;
use crate::config::ScanConfig;
use crate::error::Result;
use crate::models::{BarcodeFormat, FoundBarcode};
use crate::view::RotatedView;

/// A recognizer that reads a whole view
pub trait ImageDecoder: Send + Sync {
    /// Symbology produced by this decoder
    fn format(&self) -> BarcodeFormat;

    /// Every symbol in `view`, with polygons in view coordinates.
    ///
    /// Implementations poll `deadline` between units of work.
    fn decode_image(&self, view: &RotatedView<'_>, deadline: &Deadline) -> Result<Vec<FoundBarcode>>;
}

/// Run each decoder over `view` and report its results in source coordinates
pub fn scan_image(
    view: &RotatedView<'_>,
    decoders: &[&dyn ImageDecoder],
    config: &ScanConfig,
    deadline: &Deadline,
    sink: &mut ResultSink<'_>,
) -> Result<ScanControl> {
    for decoder in decoders {
        deadline.check()?;
        let found = decoder.decode_image(view, deadline)?;
        debug!(
            "{} at {} deg: {} symbols",
            decoder.format().name(),
            view.angle(),
            found.len()
        );
        for mut barcode in found {
            if barcode.value.chars().count() < config.min_value_length {
                continue;
            }
            let polygon = unrotate_polygon(view, &barcode.polygon);
            barcode.set_polygon(polygon);
            if sink.report(barcode) == ScanControl::Stop {
                return Ok(ScanControl::Stop);
            }
        }
    }
    Ok(ScanControl::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binarizer::Binarizer;
    use crate::config::FilterKind;
    use crate::models::{GrayImage, Point, Rect};

    struct Fixed(Vec<FoundBarcode>);

    impl ImageDecoder for Fixed {
        fn format(&self) -> BarcodeFormat {
            BarcodeFormat::Micr
        }

        fn decode_image(&self, _: &RotatedView<'_>, _: &Deadline) -> Result<Vec<FoundBarcode>> {
            Ok(self.0.clone())
        }
    }

    fn symbol(value: &str, rect: Rect) -> FoundBarcode {
        FoundBarcode::new(value.into(), vec![], rect, BarcodeFormat::Micr)
    }

    #[test]
    fn test_polygons_are_unrotated() {
        let image = GrayImage::filled(40, 20, 255);
        let config = ScanConfig::default();
        let base = RotatedView::direct(Binarizer::new(&image, FilterKind::Fixed, &config));
        let view = RotatedView::quarter(&base);
        let decoder = Fixed(vec![symbol("0123", Rect::new(2, 4, 10, 6))]);
        let mut found: Vec<FoundBarcode> = Vec::new();
        let mut sink = ResultSink::new(&mut found, 8);
        let control = scan_image(&view, &[&decoder], &config, &Deadline::unlimited(), &mut sink).unwrap();
        assert_eq!(control, ScanControl::Continue);
        assert_eq!(found.len(), 1);
        // view (x, y) is source (40 - y, x)
        assert_eq!(found[0].rect, Rect::new(34, 2, 36, 10));
        assert_eq!(found[0].polygon[0], Point::new(36.0, 2.0));
    }

    #[test]
    fn test_short_values_and_stop() {
        let image = GrayImage::filled(40, 20, 255);
        let config = ScanConfig::default();
        let view = RotatedView::direct(Binarizer::new(&image, FilterKind::Fixed, &config));
        let decoder = Fixed(vec![
            symbol("12", Rect::new(0, 0, 4, 4)),
            symbol("1234", Rect::new(0, 0, 4, 4)),
            symbol("5678", Rect::new(10, 10, 14, 14)),
        ]);
        let mut found: Vec<FoundBarcode> = Vec::new();
        let mut sink = ResultSink::new(&mut found, 1);
        let control = scan_image(&view, &[&decoder], &config, &Deadline::unlimited(), &mut sink).unwrap();
        assert_eq!(control, ScanControl::Stop);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "1234");
    }
}
