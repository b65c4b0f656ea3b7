/// Decoded symbols and their formats
pub mod barcode;
/// Packed bit vector for one row or column
pub mod bit_row;
/// 2D bitmap and the shared binary grid trait
pub mod matrix;
/// Grayscale pixel sources
pub mod pixels;
/// Points and integer rectangles
pub mod point;
/// Ink component bounding boxes
pub mod segment;

pub use barcode::{BarcodeFormat, FoundBarcode, StructureAppend};
pub use bit_row::BitRow;
pub use matrix::{BinaryGrid, BitMatrix};
pub use pixels::{GrayImage, PixelSource};
pub use point::{Point, Rect};
pub use segment::Segment;
