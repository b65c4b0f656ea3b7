//! Grouping of one Hough cell's segments into evenly pitched runs, and of
//! runs into candidate lines.

use log::trace;

use crate::models::{Point, Segment};

/// Allowed height deviation from the running mean
const HEIGHT_TOLERANCE: f32 = 0.3;
/// Largest gap, relative to the running pitch, that continues a run
const PITCH_TOLERANCE: f32 = 1.2;
/// Gaps below this fraction of the height are fragments of the previous glyph
const MIN_GAP_RATIO: f32 = 0.3;
/// The first gap of a run may be at most this many glyph heights
const MAX_FIRST_GAP_RATIO: f32 = 2.5;
/// Runs join a line when their gap is within this many pitches
const MAX_JOIN_PITCHES: f32 = 12.0;

/// Unit vector along a line at `degrees`
pub fn direction(degrees: f32) -> Point {
    let theta = degrees.to_radians();
    Point::new(theta.cos(), theta.sin())
}

/// Evenly pitched, equally tall segments
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    /// Segment indices, ordered along the line
    pub members: Vec<usize>,
    /// Projection of each member's center on the line direction
    pub positions: Vec<f32>,
    /// Mean member height
    pub height: f32,
}

impl Run {
    fn start(index: usize, position: f32, height: f32) -> Self {
        Self {
            members: vec![index],
            positions: vec![position],
            height,
        }
    }

    fn push(&mut self, index: usize, position: f32, height: f32) {
        let n = self.members.len() as f32;
        self.height = (self.height * n + height) / (n + 1.0);
        self.members.push(index);
        self.positions.push(position);
    }

    /// Average distance between consecutive members
    pub fn pitch(&self) -> Option<f32> {
        let n = self.positions.len();
        if n < 2 {
            return None;
        }
        Some((self.positions[n - 1] - self.positions[0]) / (n - 1) as f32)
    }

    fn first(&self) -> f32 {
        self.positions[0]
    }

    fn last(&self) -> f32 {
        self.positions[self.positions.len() - 1]
    }
}

/// Split a cell's segments into runs along the line at `degrees`.
///
/// A run breaks when a segment's height leaves the tolerance around the
/// running mean or when the gap exceeds 1.2x the running pitch.
pub fn build_runs(segments: &[Segment], members: &[usize], degrees: f32) -> Vec<Run> {
    let u = direction(degrees);
    let mut ordered: Vec<(f32, usize)> = members
        .iter()
        .map(|&i| (segments[i].center().dot(&u), i))
        .collect();
    ordered.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut runs = Vec::new();
    let mut current: Option<Run> = None;
    for (position, index) in ordered {
        let height = segments[index].height() as f32;
        let Some(run) = current.as_mut() else {
            current = Some(Run::start(index, position, height));
            continue;
        };

        let gap = position - run.last();
        if gap < MIN_GAP_RATIO * run.height {
            trace!("dropping fragment {index} at {position:.1}");
            continue;
        }
        let height_ok = (height - run.height).abs() <= HEIGHT_TOLERANCE * run.height;
        let pitch_ok = match run.pitch() {
            Some(pitch) => gap <= PITCH_TOLERANCE * pitch,
            None => gap <= MAX_FIRST_GAP_RATIO * run.height,
        };
        if height_ok && pitch_ok {
            run.push(index, position, height);
        } else {
            if let Some(done) = current.take() {
                runs.push(done);
            }
            current = Some(Run::start(index, position, height));
        }
    }
    runs.extend(current);
    runs
}

/// Runs of one line whose gaps are whole multiples of a shared pitch
#[derive(Debug, Clone, PartialEq)]
pub struct LineCandidate {
    /// Segment indices, ordered along the line
    pub members: Vec<usize>,
    /// Positions along the line, parallel to `members`
    pub positions: Vec<f32>,
    /// Symbol pitch
    pub pitch: f32,
    /// Mean symbol height
    pub height: f32,
}

struct Accumulator {
    members: Vec<usize>,
    positions: Vec<f32>,
    pitch_sum: f32,
    pitch_weight: f32,
    height: f32,
}

impl Accumulator {
    fn from_run(run: Run) -> Self {
        let gaps = run.members.len().saturating_sub(1) as f32;
        Self {
            pitch_sum: run.pitch().unwrap_or(0.0) * gaps,
            pitch_weight: gaps,
            height: run.height,
            members: run.members,
            positions: run.positions,
        }
    }

    fn pitch(&self) -> Option<f32> {
        (self.pitch_weight > 0.0).then(|| self.pitch_sum / self.pitch_weight)
    }

    fn accepts(&self, run: &Run) -> bool {
        if (run.height - self.height).abs() > HEIGHT_TOLERANCE * self.height {
            return false;
        }
        let pitch = match (self.pitch(), run.pitch()) {
            (Some(a), Some(b)) => {
                if (a - b).abs() > 0.2 * a.max(b) {
                    return false;
                }
                a
            }
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => return false,
        };
        let last = self.positions[self.positions.len() - 1];
        let k = (run.first() - last) / pitch;
        let n = k.round();
        n >= 1.0 && n <= MAX_JOIN_PITCHES && (k - n).abs() <= 0.25
    }

    fn absorb(&mut self, run: Run) {
        let gaps = run.members.len().saturating_sub(1) as f32;
        if let Some(p) = run.pitch() {
            self.pitch_sum += p * gaps;
            self.pitch_weight += gaps;
        }
        let n = self.members.len() as f32;
        let m = run.members.len() as f32;
        self.height = (self.height * n + run.height * m) / (n + m);
        self.members.extend(run.members);
        self.positions.extend(run.positions);
    }
}

/// Join runs into lines; lines without a pitch are dropped.
///
/// A run may skip over incompatible runs (special symbols, noise) to join
/// the most recent line it fits.
pub fn join_runs(runs: Vec<Run>) -> Vec<LineCandidate> {
    let mut lines: Vec<Accumulator> = Vec::new();
    for run in runs {
        match lines.iter_mut().rev().find(|line| line.accepts(&run)) {
            Some(line) => line.absorb(run),
            None => lines.push(Accumulator::from_run(run)),
        }
    }
    lines
        .into_iter()
        .filter_map(|acc| {
            let pitch = acc.pitch()?;
            Some(LineCandidate {
                members: acc.members,
                positions: acc.positions,
                pitch,
                height: acc.height,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(x: usize, y: usize, w: usize, h: usize) -> Segment {
        let mut s = Segment::from_pixel(x, y);
        s.include(x + w - 1, y + h - 1);
        s
    }

    #[test]
    fn test_even_row_is_one_run() {
        let segments: Vec<Segment> = (0..6).map(|i| glyph(10 + i * 30, 20, 20, 28)).collect();
        let members: Vec<usize> = (0..6).rev().collect();
        let runs = build_runs(&segments, &members, 0.0);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].members, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(runs[0].pitch(), Some(30.0));
    }

    #[test]
    fn test_height_and_gap_breaks() {
        let mut segments: Vec<Segment> = (0..4).map(|i| glyph(10 + i * 30, 20, 20, 28)).collect();
        // short mark
        segments.push(glyph(130, 28, 20, 10));
        // far glyphs
        segments.extend((0..3).map(|i| glyph(250 + i * 30, 20, 20, 28)));
        let members: Vec<usize> = (0..segments.len()).collect();
        let runs = build_runs(&segments, &members, 0.0);
        let sizes: Vec<usize> = runs.iter().map(|r| r.members.len()).collect();
        assert_eq!(sizes, vec![4, 1, 3]);
    }

    #[test]
    fn test_runs_join_across_missing_symbols() {
        let mut segments: Vec<Segment> = (0..4).map(|i| glyph(10 + i * 30, 20, 20, 28)).collect();
        // two empty slots, then three more glyphs at the same pitch
        segments.extend((0..3).map(|i| glyph(10 + (6 + i) * 30, 20, 20, 28)));
        let members: Vec<usize> = (0..segments.len()).collect();
        let runs = build_runs(&segments, &members, 0.0);
        assert_eq!(runs.len(), 2);
        let lines = join_runs(runs);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].members.len(), 7);
        assert!((lines[0].pitch - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_runs_join_around_short_marks() {
        let mut segments: Vec<Segment> = (0..3).map(|i| glyph(10 + i * 30, 20, 20, 28)).collect();
        // a short mark in slot 3, digits resume in slot 4
        segments.push(glyph(100, 30, 20, 8));
        segments.extend((4..7).map(|i| glyph(10 + i * 30, 20, 20, 28)));
        let members: Vec<usize> = (0..segments.len()).collect();
        let lines = join_runs(build_runs(&segments, &members, 0.0));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].members, vec![0, 1, 2, 4, 5, 6]);
    }
}
