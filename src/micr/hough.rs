//! Hough voting of segment centers in `(angle, distance)` space.

use std::collections::BTreeMap;

use log::debug;

use crate::models::Segment;

/// Angular tolerance around the skew fixed by the first accepted line
pub const SKEW_TOLERANCE_DEGREES: i32 = 3;

/// One `(angle, distance)` bucket and the segments that voted for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoughCell {
    /// Line angle in whole degrees
    pub angle: i32,
    /// Distance bucket (`floor(d / quantum)`)
    pub bucket: i64,
    /// Indices into the voted segment list, ascending
    pub segments: Vec<usize>,
}

impl HoughCell {
    /// Number of votes
    pub fn count(&self) -> usize {
        self.segments.len()
    }

    /// True when the cell has at least `min_segments` votes
    pub fn reaches(&self, min_segments: usize) -> bool {
        self.count() >= min_segments
    }
}

/// Distance bucket size: half the median segment height, at least 2 px
pub fn distance_quantum(segments: &[Segment]) -> f32 {
    if segments.is_empty() {
        return 2.0;
    }
    let mut heights: Vec<usize> = segments.iter().map(|s| s.height()).collect();
    heights.sort_unstable();
    (heights[heights.len() / 2] as f32 / 2.0).max(2.0)
}

/// Signed distance of `(x, y)` to the line through the origin at `degrees`
#[inline]
pub fn line_distance(x: f32, y: f32, degrees: f32) -> f32 {
    let theta = degrees.to_radians();
    -x * theta.sin() + y * theta.cos()
}

/// Vote every segment center for each angle in `-max_skew..=max_skew`.
///
/// Cells are returned strongest first: more votes, then smaller absolute
/// angle, then angle and bucket ascending, so equal inputs always give the
/// same order.
pub fn vote(segments: &[Segment], max_skew_degrees: f32, quantum: f32) -> Vec<HoughCell> {
    let max_skew = max_skew_degrees.max(0.0).floor() as i32;
    let mut accumulator: BTreeMap<(i32, i64), Vec<usize>> = BTreeMap::new();

    for (i, segment) in segments.iter().enumerate() {
        let c = segment.center();
        for angle in -max_skew..=max_skew {
            let d = line_distance(c.x, c.y, angle as f32);
            let bucket = (d / quantum).floor() as i64;
            accumulator.entry((angle, bucket)).or_default().push(i);
        }
    }

    let mut cells: Vec<HoughCell> = accumulator
        .into_iter()
        .map(|((angle, bucket), segments)| HoughCell {
            angle,
            bucket,
            segments,
        })
        .collect();
    cells.sort_by(|a, b| {
        b.count()
            .cmp(&a.count())
            .then(a.angle.abs().cmp(&b.angle.abs()))
            .then(a.angle.cmp(&b.angle))
            .then(a.bucket.cmp(&b.bucket))
    });
    debug!(
        "hough: {} segments, {} cells, strongest {:?}",
        segments.len(),
        cells.len(),
        cells.first().map(|c| (c.angle, c.bucket, c.count()))
    );
    cells
}

/// True when `angle` is usable once a document skew has been fixed
pub fn angle_consistent(angle: i32, fixed_skew: Option<i32>) -> bool {
    fixed_skew.is_none_or(|skew| (angle - skew).abs() <= SKEW_TOLERANCE_DEGREES)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(x: usize, y: usize) -> Segment {
        let mut s = Segment::from_pixel(x, y);
        s.include(x + 4, y + 8);
        s
    }

    fn sample() -> Vec<Segment> {
        let mut segments: Vec<Segment> = (0..8).map(|i| dot(20 + i * 12, 50)).collect();
        segments.push(dot(5, 5));
        segments.push(dot(90, 10));
        segments.push(dot(40, 80));
        segments
    }

    #[test]
    fn test_minimum_vote_count_is_inclusive() {
        let cell = HoughCell {
            angle: 0,
            bucket: 4,
            segments: vec![0, 1, 2],
        };
        assert!(cell.reaches(3));
        assert!(!cell.reaches(4));
    }

    #[test]
    fn test_collinear_points_win_deterministically() {
        let segments = sample();
        let q = distance_quantum(&segments);
        let first = vote(&segments, 10.0, q);
        let best = &first[0];
        assert_eq!(best.angle, 0);
        assert_eq!(best.count(), 8);
        assert_eq!(best.bucket, (54.0 / q).floor() as i64);
        assert_eq!(best.segments, (0..8).collect::<Vec<_>>());

        for _ in 0..5 {
            let again = vote(&segments, 10.0, q);
            assert_eq!(again[0], *best);
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_skewed_line_found_at_its_angle() {
        // points along a 5 degree slope
        let slope = 5f32.to_radians().tan();
        let segments: Vec<Segment> = (0..10)
            .map(|i| {
                let x = 10 + i * 20;
                dot(x, (40.0 + x as f32 * slope).round() as usize)
            })
            .collect();
        let cells = vote(&segments, 10.0, 10.0);
        assert_eq!(cells[0].count(), 10);
        assert!((cells[0].angle - 5).abs() <= 1);
    }

    #[test]
    fn test_angle_consistency() {
        assert!(angle_consistent(7, None));
        assert!(angle_consistent(2, Some(0)));
        assert!(!angle_consistent(4, Some(0)));
    }
}
