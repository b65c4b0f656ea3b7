use super::BitRow;

/// Read-only access to a binary image (true = black).
///
/// Out-of-range reads must return `false`.
pub trait BinaryGrid {
    /// Width in pixels
    fn width(&self) -> usize;
    /// Height in pixels
    fn height(&self) -> usize;
    /// Pixel at (x, y)
    fn get(&self, x: usize, y: usize) -> bool;

    /// Signed-coordinate read; negative coordinates are white
    fn get_signed(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        self.get(x as usize, y as usize)
    }
}

/// Whole-image bitmap stored as one [`BitRow`] per scanline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    width: usize,
    rows: Vec<BitRow>,
}

impl BitMatrix {
    /// Create an all-white matrix with given dimensions
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            rows: (0..height).map(|_| BitRow::new(width)).collect(),
        }
    }

    /// Assemble a matrix from equally sized rows
    pub fn from_rows(width: usize, rows: Vec<BitRow>) -> Self {
        debug_assert!(rows.iter().all(|r| r.size() == width));
        Self { width, rows }
    }

    /// Get matrix width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get matrix height
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Get bit at (x, y)
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.rows.get(y).is_some_and(|r| r.get(x))
    }

    /// Set bit at (x, y)
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if let Some(row) = self.rows.get_mut(y) {
            row.set(x, value);
        }
    }

    /// Borrow row `y`
    pub fn row(&self, y: usize) -> &BitRow {
        &self.rows[y]
    }

    /// Copy out column `x`
    pub fn column(&self, x: usize) -> BitRow {
        let mut col = BitRow::new(self.rows.len());
        for (y, row) in self.rows.iter().enumerate() {
            if row.get(x) {
                col.set(y, true);
            }
        }
        col
    }

    /// Count black pixels
    pub fn count_ones(&self) -> usize {
        self.rows.iter().map(BitRow::count_ones).sum()
    }

    /// Clear all bits to white
    pub fn clear(&mut self) {
        self.rows.iter_mut().for_each(BitRow::clear);
    }

    /// Consume the matrix, yielding its rows
    pub fn into_rows(self) -> Vec<BitRow> {
        self.rows
    }
}

impl BinaryGrid for BitMatrix {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.rows.len()
    }

    fn get(&self, x: usize, y: usize) -> bool {
        BitMatrix::get(self, x, y)
    }
}

impl Default for BitMatrix {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_matrix() {
        let mut matrix = BitMatrix::new(8, 8);
        assert_eq!(matrix.width(), 8);
        assert_eq!(matrix.height(), 8);

        matrix.set(3, 4, true);
        assert!(matrix.get(3, 4));
        assert!(!matrix.get(3, 3));
        assert!(matrix.column(3).get(4));
        assert_eq!(matrix.count_ones(), 1);

        matrix.clear();
        assert!(!matrix.get(3, 4));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut matrix = BitMatrix::new(8, 8);
        matrix.set(10, 10, true); // Should not panic
        assert!(!matrix.get(10, 10));
        assert!(!matrix.get_signed(-1, 2));
    }
}
