/// Dense bit vector holding one binarized row or column (true = black).
///
/// The size is fixed at construction. Reads past the end return `false`
/// (white) so scanners never need explicit border checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitRow {
    size: usize,
    words: Vec<u32>,
}

impl BitRow {
    /// Create an all-white row with `size` bits
    pub fn new(size: usize) -> Self {
        Self {
            size,
            words: vec![0; size.div_ceil(32)],
        }
    }

    /// Build a row from a bool slice
    pub fn from_bools(bits: &[bool]) -> Self {
        let mut row = Self::new(bits.len());
        for (i, &b) in bits.iter().enumerate() {
            if b {
                row.set(i, true);
            }
        }
        row
    }

    /// Number of bits
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get bit `i`; out-of-range reads are white
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        if i >= self.size {
            return false;
        }
        (self.words[i >> 5] >> (i & 31)) & 1 == 1
    }

    /// Set bit `i`; out-of-range writes are ignored
    #[inline]
    pub fn set(&mut self, i: usize, value: bool) {
        if i >= self.size {
            return;
        }
        let mask = 1u32 << (i & 31);
        if value {
            self.words[i >> 5] |= mask;
        } else {
            self.words[i >> 5] &= !mask;
        }
    }

    /// Flip bit `i`
    pub fn flip(&mut self, i: usize) {
        if i < self.size {
            self.words[i >> 5] ^= 1 << (i & 31);
        }
    }

    /// Clear all bits to white
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// True when every bit in `[start, end)` equals `value`.
    ///
    /// An empty range is trivially true. The range is clipped to the row.
    pub fn is_range(&self, start: usize, end: usize, value: bool) -> bool {
        let end = end.min(self.size);
        if start >= end {
            return true;
        }
        let first_word = start >> 5;
        let last_word = (end - 1) >> 5;
        for w in first_word..=last_word {
            let lo = if w == first_word { start & 31 } else { 0 };
            let hi = if w == last_word { (end - 1) & 31 } else { 31 };
            let mask = if hi - lo == 31 {
                u32::MAX
            } else {
                ((1u32 << (hi - lo + 1)) - 1) << lo
            };
            let bits = self.words[w] & mask;
            let expected = if value { mask } else { 0 };
            if bits != expected {
                return false;
            }
        }
        true
    }

    /// Index of the first black bit at or after `from`, or `size()` if none
    pub fn next_set(&self, from: usize) -> usize {
        self.next_matching(from, true)
    }

    /// Index of the first white bit at or after `from`, or `size()` if none
    pub fn next_unset(&self, from: usize) -> usize {
        self.next_matching(from, false)
    }

    fn next_matching(&self, from: usize, value: bool) -> usize {
        if from >= self.size {
            return self.size;
        }
        let mut w = from >> 5;
        let mut word = if value { self.words[w] } else { !self.words[w] };
        word &= u32::MAX << (from & 31);
        loop {
            if word != 0 {
                let idx = (w << 5) + word.trailing_zeros() as usize;
                return idx.min(self.size);
            }
            w += 1;
            if w >= self.words.len() {
                return self.size;
            }
            word = if value { self.words[w] } else { !self.words[w] };
        }
    }

    /// Count black bits
    pub fn count_ones(&self) -> usize {
        let full = self.size >> 5;
        let mut total: usize = self.words[..full]
            .iter()
            .map(|w| w.count_ones() as usize)
            .sum();
        let rem = self.size & 31;
        if rem != 0 {
            total += (self.words[full] & ((1u32 << rem) - 1)).count_ones() as usize;
        }
        total
    }

    /// Reverse the bit order in place, so bit `i` moves to `size - 1 - i`
    pub fn reverse(&mut self) {
        let size = self.size;
        let mut reversed = BitRow::new(size);
        for i in 0..size {
            if self.get(i) {
                reversed.set(size - 1 - i, true);
            }
        }
        self.words = reversed.words;
    }

    /// Reversed copy of this row
    pub fn reversed(&self) -> Self {
        let mut copy = self.clone();
        copy.reverse();
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_round_trip() {
        let mut row = BitRow::new(70);
        for i in 0..70 {
            let v = i % 3 == 0;
            row.set(i, v);
            assert_eq!(row.get(i), v);
        }
        for i in 0..70 {
            row.set(i, true);
            assert!(row.get(i));
            row.set(i, false);
            assert!(!row.get(i));
        }
    }

    #[test]
    fn test_out_of_range_is_white() {
        let mut row = BitRow::new(10);
        row.set(12, true);
        assert!(!row.get(12));
        assert!(!row.get(10_000));
        assert_eq!(row.count_ones(), 0);
    }

    #[test]
    fn test_is_range() {
        let mut row = BitRow::new(100);
        for i in 30..70 {
            row.set(i, true);
        }
        assert!(row.is_range(30, 70, true));
        assert!(row.is_range(0, 30, false));
        assert!(row.is_range(70, 100, false));
        assert!(!row.is_range(29, 70, true));
        assert!(!row.is_range(30, 71, true));
        assert!(row.is_range(40, 40, true));
        // whole-word span
        assert!(row.is_range(32, 64, true));
    }

    #[test]
    fn test_next_set_unset() {
        let mut row = BitRow::new(80);
        row.set(5, true);
        row.set(6, true);
        row.set(40, true);
        assert_eq!(row.next_set(0), 5);
        assert_eq!(row.next_unset(5), 7);
        assert_eq!(row.next_set(7), 40);
        assert_eq!(row.next_set(41), 80);
        assert_eq!(row.next_unset(80), 80);
    }

    #[test]
    fn test_reverse() {
        let mut row = BitRow::new(37);
        row.set(0, true);
        row.set(3, true);
        row.set(36, false);
        row.reverse();
        assert!(row.get(36));
        assert!(row.get(33));
        assert!(!row.get(0));
        assert_eq!(row.count_ones(), 2);
        assert_eq!(row.reversed().reversed(), row);
    }
}
