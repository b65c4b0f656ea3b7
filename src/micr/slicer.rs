/// Connected ink components for MICR line detection
/// Labels 8-connected black regions and keeps those within radius bounds
use crate::models::{BinaryGrid, Segment};

/// Union-Find over provisional labels, with path halving
pub struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    /// `n` singleton sets
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
        }
    }

    /// Add one more singleton set and return its label
    pub fn push(&mut self) -> u32 {
        let label = self.parent.len() as u32;
        self.parent.push(label);
        label
    }

    /// Representative of `x`
    pub fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let grandparent = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grandparent;
            x = grandparent;
        }
        x
    }

    /// Merge the sets of `x` and `y`; the smaller root wins
    pub fn union(&mut self, x: u32, y: u32) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x < root_y {
            self.parent[root_y as usize] = root_x;
        } else if root_y < root_x {
            self.parent[root_x as usize] = root_y;
        }
    }
}

/// Bounding boxes of every 8-connected black component, in order of their
/// top-left-most pixel
pub fn find_segments(grid: &dyn BinaryGrid) -> Vec<Segment> {
    let width = grid.width();
    let height = grid.height();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    // label 0 = background
    let mut labels = vec![0u32; width * height];
    let mut uf = UnionFind::new(1);

    // First pass: provisional labels from the four already visited neighbors
    for y in 0..height {
        for x in 0..width {
            if !grid.get(x, y) {
                continue;
            }
            let mut neighbors = [0u32; 4];
            if x > 0 {
                neighbors[0] = labels[y * width + x - 1];
            }
            if y > 0 {
                neighbors[1] = labels[(y - 1) * width + x];
                if x > 0 {
                    neighbors[2] = labels[(y - 1) * width + x - 1];
                }
                if x + 1 < width {
                    neighbors[3] = labels[(y - 1) * width + x + 1];
                }
            }

            let min_label = neighbors.iter().copied().filter(|&l| l != 0).min();
            labels[y * width + x] = match min_label {
                None => uf.push(),
                Some(min_label) => {
                    for &l in &neighbors {
                        if l != 0 && l != min_label {
                            uf.union(min_label, l);
                        }
                    }
                    min_label
                }
            };
        }
    }

    // Second pass: grow one box per root
    let mut slot_of_root: Vec<Option<usize>> = vec![None; uf.parent.len()];
    let mut segments: Vec<Segment> = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let label = labels[y * width + x];
            if label == 0 {
                continue;
            }
            let root = uf.find(label) as usize;
            match slot_of_root[root] {
                Some(i) => segments[i].include(x, y),
                None => {
                    slot_of_root[root] = Some(segments.len());
                    segments.push(Segment::from_pixel(x, y));
                }
            }
        }
    }
    segments
}

/// Components whose radius lies within `[min_radius, max_radius]`
pub fn slice(grid: &dyn BinaryGrid, min_radius: f32, max_radius: f32) -> Vec<Segment> {
    let all = find_segments(grid);
    let total = all.len();
    let kept: Vec<Segment> = all
        .into_iter()
        .filter(|s| (min_radius..=max_radius).contains(&s.radius()))
        .collect();
    log::debug!("slicer kept {} of {total} components", kept.len());
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BitMatrix;

    #[test]
    fn test_find_black_regions() {
        let mut matrix = BitMatrix::new(10, 10);
        // 2x2 black square at (2,2)
        matrix.set(2, 2, true);
        matrix.set(3, 2, true);
        matrix.set(2, 3, true);
        matrix.set(3, 3, true);

        let segments = find_segments(&matrix);
        assert_eq!(segments.len(), 1);
        let s = segments[0];
        assert_eq!((s.x_in, s.y_in, s.x_end, s.y_end, s.area), (2, 2, 3, 3, 4));
    }

    #[test]
    fn test_diagonal_and_u_shapes_join() {
        let mut matrix = BitMatrix::new(8, 8);
        // diagonal stroke
        for i in 0..4 {
            matrix.set(i, i, true);
        }
        // U shape whose arms meet only at the bottom
        for y in 0..4 {
            matrix.set(5, y, true);
            matrix.set(7, y, true);
        }
        matrix.set(6, 3, true);
        let segments = find_segments(&matrix);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].area, 4);
        assert_eq!((segments[1].x_in, segments[1].x_end), (5, 7));
        assert_eq!(segments[1].area, 9);
    }

    #[test]
    fn test_radius_filter() {
        let mut matrix = BitMatrix::new(30, 10);
        matrix.set(1, 1, true);
        for y in 0..8 {
            for x in 10..18 {
                matrix.set(x, y, true);
            }
        }
        let segments = slice(&matrix, 2.0, 10.0);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].x_in, 10);
    }
}
