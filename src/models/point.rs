use serde::{Deserialize, Serialize};

/// 2D point with floating point coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Dot product, treating both points as vectors
    pub fn dot(&self, other: &Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// `self + other * k`
    pub fn add_scaled(&self, other: &Point, k: f32) -> Self {
        Self {
            x: self.x + other.x * k,
            y: self.y + other.y * k,
        }
    }
}

/// Axis-aligned rectangle, `right`/`bottom` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge (inclusive)
    pub left: i32,
    /// Top edge (inclusive)
    pub top: i32,
    /// Right edge (exclusive)
    pub right: i32,
    /// Bottom edge (exclusive)
    pub bottom: i32,
}

impl Rect {
    /// Create a rectangle from its edges
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Width in pixels
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Height in pixels
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Grown by `margin` pixels on every side
    pub fn expanded(&self, margin: i32) -> Rect {
        Rect::new(
            self.left - margin,
            self.top - margin,
            self.right + margin,
            self.bottom + margin,
        )
    }

    /// True when the rectangles share at least one pixel
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// Bounding box of a set of points, rounded outward
    pub fn bounding(points: &[Point]) -> Rect {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if points.is_empty() {
            return Rect::default();
        }
        Rect::new(
            min_x.floor() as i32,
            min_y.floor() as i32,
            max_x.ceil() as i32,
            max_y.ceil() as i32,
        )
    }

    /// Closed polygon `[tl, tr, br, bl, tl]` tracing the rectangle
    pub fn polygon(&self) -> [Point; 5] {
        let tl = Point::new(self.left as f32, self.top as f32);
        [
            tl,
            Point::new(self.right as f32, self.top as f32),
            Point::new(self.right as f32, self.bottom as f32),
            Point::new(self.left as f32, self.bottom as f32),
            tl,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_union() {
        let a = Rect::new(10, 5, 50, 6);
        let b = Rect::new(8, 6, 48, 7);
        let u = a.union(&b);
        assert_eq!(u, Rect::new(8, 5, 50, 7));
        assert!(a.intersects(&Rect::new(49, 5, 60, 6)));
        assert!(!a.intersects(&Rect::new(50, 5, 60, 6)));
        assert_eq!(a.expanded(2), Rect::new(8, 3, 52, 8));
    }

    #[test]
    fn test_polygon_is_closed() {
        let poly = Rect::new(1, 2, 3, 4).polygon();
        assert_eq!(poly[0], poly[4]);
        assert_eq!(Rect::bounding(&poly), Rect::new(1, 2, 3, 4));
    }
}
