use super::Point;

/// Bounding box of one connected patch of ink.
///
/// Coordinates are inclusive on both ends. `scanned` marks segments already
/// consumed by a MICR line so overlapping Hough cells do not reuse them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Leftmost ink column
    pub x_in: usize,
    /// Rightmost ink column
    pub x_end: usize,
    /// Topmost ink row
    pub y_in: usize,
    /// Bottom ink row
    pub y_end: usize,
    /// Number of ink pixels
    pub area: usize,
    /// Already consumed by a recognized line
    pub scanned: bool,
}

impl Segment {
    /// Segment covering a single pixel
    pub fn from_pixel(x: usize, y: usize) -> Self {
        Self {
            x_in: x,
            x_end: x,
            y_in: y,
            y_end: y,
            area: 1,
            scanned: false,
        }
    }

    /// Grow the box to include (x, y)
    pub fn include(&mut self, x: usize, y: usize) {
        self.x_in = self.x_in.min(x);
        self.x_end = self.x_end.max(x);
        self.y_in = self.y_in.min(y);
        self.y_end = self.y_end.max(y);
        self.area += 1;
    }

    /// Box width in pixels
    pub fn width(&self) -> usize {
        self.x_end - self.x_in + 1
    }

    /// Box height in pixels
    pub fn height(&self) -> usize {
        self.y_end - self.y_in + 1
    }

    /// Half the larger box side
    pub fn radius(&self) -> f32 {
        self.width().max(self.height()) as f32 / 2.0
    }

    /// Box center
    pub fn center(&self) -> Point {
        Point::new(
            (self.x_in + self.x_end) as f32 / 2.0,
            (self.y_in + self.y_end) as f32 / 2.0,
        )
    }
}
