//! Rotation-aware access to a binarized image.
//!
//! A [`RotatedView`] is either the binarizer itself, a quarter turn of
//! another view (rows are borrowed columns, no resampling), or an arbitrary
//! rotation sampled lazily along an affine basis. Every view can map a
//! point back to source-image coordinates with [`RotatedView::unrotate`].

use log::debug;

use crate::binarizer::{Binarizer, LineCache};
use crate::models::{BinaryGrid, BitRow, Point};

enum ViewKind<'a> {
    Direct(Binarizer<'a>),
    Quarter(&'a RotatedView<'a>),
    Arbitrary {
        base: &'a RotatedView<'a>,
        p0: Point,
        vd_x: Point,
        vd_y: Point,
    },
}

/// Binary image seen at some rotation of the source
pub struct RotatedView<'a> {
    kind: ViewKind<'a>,
    width: usize,
    height: usize,
    angle: f32,
    rows: LineCache,
    columns: LineCache,
}

impl<'a> RotatedView<'a> {
    /// Unrotated view over `binarizer`
    pub fn direct(binarizer: Binarizer<'a>) -> Self {
        let (width, height) = (binarizer.width(), binarizer.height());
        Self {
            kind: ViewKind::Direct(binarizer),
            width,
            height,
            angle: 0.0,
            rows: LineCache::default(),
            columns: LineCache::default(),
        }
    }

    /// `base` turned by 90 degrees: rotated (x, y) reads base (W-1-y, x)
    pub fn quarter(base: &'a RotatedView<'a>) -> Self {
        Self {
            kind: ViewKind::Quarter(base),
            width: base.height,
            height: base.width,
            angle: base.angle + 90.0,
            rows: LineCache::default(),
            columns: LineCache::new(base.height),
        }
    }

    /// `base` turned by `degrees`; exact quarter turns use the borrowed path
    pub fn rotated(base: &'a RotatedView<'a>, degrees: f32) -> Self {
        let normalized = degrees.rem_euclid(360.0);
        if normalized == 90.0 {
            return Self::quarter(base);
        }

        let theta = normalized.to_radians();
        let vd_x = Point::new(theta.cos(), theta.sin());
        let vd_y = Point::new(-theta.sin(), theta.cos());
        let (bw, bh) = (base.width as f32, base.height as f32);
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(bw, 0.0),
            Point::new(0.0, bh),
            Point::new(bw, bh),
        ];
        let (mut min_u, mut max_u) = (f32::MAX, f32::MIN);
        let (mut min_v, mut max_v) = (f32::MAX, f32::MIN);
        for c in &corners {
            let (u, v) = (c.dot(&vd_x), c.dot(&vd_y));
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }
        // round away float noise before ceil so 0/180 keep the base size
        let width = ((max_u - min_u) * 1e3).round() / 1e3;
        let height = ((max_v - min_v) * 1e3).round() / 1e3;
        let (width, height) = (width.ceil() as usize, height.ceil() as usize);
        let p0 = Point::new(0.0, 0.0)
            .add_scaled(&vd_x, min_u)
            .add_scaled(&vd_y, min_v);
        debug!("rotated view {normalized} deg: {width}x{height}");

        Self {
            kind: ViewKind::Arbitrary {
                base,
                p0,
                vd_x,
                vd_y,
            },
            width,
            height,
            angle: base.angle + normalized,
            rows: LineCache::new(height),
            columns: LineCache::new(width),
        }
    }

    /// View width
    pub fn width(&self) -> usize {
        self.width
    }

    /// View height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total rotation relative to the source, in degrees
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Binarizer at the bottom of the view chain
    pub fn binarizer(&self) -> &Binarizer<'a> {
        match &self.kind {
            ViewKind::Direct(b) => b,
            ViewKind::Quarter(base) | ViewKind::Arbitrary { base, .. } => base.binarizer(),
        }
    }

    /// Row `y`. Panics when `y >= height`.
    pub fn row(&self, y: usize) -> &BitRow {
        match &self.kind {
            ViewKind::Direct(b) => b.row(y),
            ViewKind::Quarter(base) => base.column(base.width - 1 - y),
            ViewKind::Arbitrary { .. } => self.rows.get_or_compute(y, || {
                let mut row = BitRow::new(self.width);
                for x in 0..self.width {
                    row.set(x, self.sample(x, y));
                }
                row
            }),
        }
    }

    /// Column `x`. Panics when `x >= width`.
    pub fn column(&self, x: usize) -> &BitRow {
        match &self.kind {
            ViewKind::Direct(b) => b.column(x),
            ViewKind::Quarter(base) => self.columns.get_or_compute(x, || base.row(x).reversed()),
            ViewKind::Arbitrary { .. } => self.columns.get_or_compute(x, || {
                let mut column = BitRow::new(self.height);
                for y in 0..self.height {
                    column.set(y, self.sample(x, y));
                }
                column
            }),
        }
    }

    fn sample(&self, x: usize, y: usize) -> bool {
        match &self.kind {
            ViewKind::Arbitrary {
                base,
                p0,
                vd_x,
                vd_y,
            } => {
                let p = p0
                    .add_scaled(vd_x, x as f32 + 0.5)
                    .add_scaled(vd_y, y as f32 + 0.5);
                base.get_signed(p.x.floor() as i64, p.y.floor() as i64)
            }
            _ => self.get(x, y),
        }
    }

    /// True when `x` is a valid column
    pub fn in_x(&self, x: i64) -> bool {
        x >= 0 && (x as usize) < self.width
    }

    /// True when `y` is a valid row
    pub fn in_y(&self, y: i64) -> bool {
        y >= 0 && (y as usize) < self.height
    }

    /// True when (x, y) lies inside the view
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        self.in_x(x) && self.in_y(y)
    }

    /// Bilinear blend of the four pixels around (x, y), black = +1 and
    /// white = -1. Pixel centers sit at half-integer coordinates.
    pub fn get_pixel_interpolated(&self, x: f32, y: f32) -> f32 {
        let fx = x - 0.5;
        let fy = y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);
        let s = |x: i64, y: i64| if self.get_signed(x, y) { 1.0 } else { -1.0 };
        let top = s(x0, y0) * (1.0 - tx) + s(x0 + 1, y0) * tx;
        let bottom = s(x0, y0 + 1) * (1.0 - tx) + s(x0 + 1, y0 + 1) * tx;
        top * (1.0 - ty) + bottom * ty
    }

    /// Map a point of this view to source-image coordinates
    pub fn unrotate(&self, p: Point) -> Point {
        match &self.kind {
            ViewKind::Direct(_) => p,
            ViewKind::Quarter(base) => base.unrotate(Point::new(base.width as f32 - p.y, p.x)),
            ViewKind::Arbitrary {
                base,
                p0,
                vd_x,
                vd_y,
            } => base.unrotate(p0.add_scaled(vd_x, p.x).add_scaled(vd_y, p.y)),
        }
    }

    /// Drop cached rows and columns together. A direct view also resets its
    /// binarizer; derived views only drop their own caches.
    pub fn reset_columns(&mut self) {
        if let ViewKind::Direct(b) = &mut self.kind {
            b.reset_columns();
        }
        self.rows.reset();
        self.columns.reset();
    }
}

impl BinaryGrid for RotatedView<'_> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.row(y).get(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilterKind, ScanConfig};
    use crate::models::GrayImage;

    fn l_shape() -> GrayImage {
        // 20x10, black block at x 2..6, y 1..3
        let mut img = GrayImage::filled(20, 10, 255);
        img.fill_rect(2, 1, 6, 3, 0);
        img
    }

    fn direct(img: &GrayImage) -> RotatedView<'_> {
        RotatedView::direct(Binarizer::new(img, FilterKind::Fixed, &ScanConfig::default()))
    }

    #[test]
    fn test_quarter_turn_mapping() {
        let img = l_shape();
        let base = direct(&img);
        let q = RotatedView::quarter(&base);
        assert_eq!((q.width(), q.height()), (10, 20));
        for y in 0..q.height() {
            for x in 0..q.width() {
                assert_eq!(q.get(x, y), base.get(19 - y, x), "({x},{y})");
                assert_eq!(q.column(x).get(y), q.row(y).get(x));
            }
        }
    }

    #[test]
    fn test_quarter_unrotate_round_trip() {
        let img = l_shape();
        let base = direct(&img);
        let q = RotatedView::quarter(&base);
        // pixel center (x, y) of q is the center of base pixel (19 - y, x)
        let p = q.unrotate(Point::new(3.5, 4.5));
        assert_eq!(p, Point::new(15.5, 3.5));
    }

    #[test]
    fn test_half_turn_via_arbitrary_path() {
        let img = l_shape();
        let base = direct(&img);
        let half = RotatedView::rotated(&base, 180.0);
        assert_eq!((half.width(), half.height()), (20, 10));
        for y in 0..10 {
            for x in 0..20 {
                assert_eq!(half.get(x, y), base.get(19 - x, 9 - y), "({x},{y})");
            }
        }
        let p = half.unrotate(Point::new(0.5, 0.5));
        assert!((p.x - 19.5).abs() < 1e-3 && (p.y - 9.5).abs() < 1e-3);
    }

    #[test]
    fn test_arbitrary_angle_unrotates_black_pixels() {
        let img = l_shape();
        let base = direct(&img);
        let view = RotatedView::rotated(&base, 30.0);
        let mut checked = 0;
        for y in 0..view.height() {
            for x in 0..view.width() {
                if view.get(x, y) {
                    let p = view.unrotate(Point::new(x as f32 + 0.5, y as f32 + 0.5));
                    assert!(base.get(p.x.floor() as usize, p.y.floor() as usize));
                    checked += 1;
                }
            }
        }
        assert!(checked > 0);
    }

    #[test]
    fn test_out_of_range_is_white() {
        let img = l_shape();
        let base = direct(&img);
        assert!(!base.get(100, 0));
        assert!(!base.get_signed(-1, 2));
        assert!(!base.in_bounds(20, 0));
        assert!(base.in_bounds(19, 9));
    }

    #[test]
    fn test_interpolation_blends_signs() {
        let img = l_shape();
        let base = direct(&img);
        assert_eq!(base.get_pixel_interpolated(3.5, 1.5), 1.0);
        assert_eq!(base.get_pixel_interpolated(10.5, 6.5), -1.0);
        // halfway between black x=5 and white x=6
        assert!(base.get_pixel_interpolated(6.0, 1.5).abs() < 1e-6);
    }
}
