//! E-13B glyph templates.
//!
//! Each template is a grid of cells trimmed to its ink extents:
//! `#` black (weight 2), `+` gray edge (weight 1), `.` white (weight 0).
//! Digits are one connected stroke and share the full cell height; the four
//! special symbols are built from short separate marks.

/// Number of templates: ten digits plus four special symbols
pub const GLYPH_COUNT: usize = 14;
/// Template height of a digit, in cells
pub const DIGIT_ROWS: usize = 9;
/// Horizontal slot of one symbol, in cells (glyph plus spacing)
pub const PITCH_CELLS: usize = 9;

/// One recognizable symbol
#[derive(Debug, Clone, Copy)]
pub struct GlyphTemplate {
    /// Text emitted for this symbol
    pub symbol: char,
    /// Rows of `#`, `+` and `.` cells
    pub rows: &'static [&'static str],
}

impl GlyphTemplate {
    /// Width in cells
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    /// Height in cells
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Weight of cell (x, y): 0 white, 1 gray, 2 black
    #[inline]
    pub fn weight(&self, x: usize, y: usize) -> u8 {
        match self.rows[y].as_bytes()[x] {
            b'#' => 2,
            b'+' => 1,
            _ => 0,
        }
    }

    /// Mean weight / 2 along one border: 0 left, 1 top, 2 right, 3 bottom
    pub fn border_level(&self, side: usize) -> f32 {
        let (w, h) = (self.width(), self.height());
        let cells: Vec<u8> = match side {
            0 => (0..h).map(|y| self.weight(0, y)).collect(),
            1 => (0..w).map(|x| self.weight(x, 0)).collect(),
            2 => (0..h).map(|y| self.weight(w - 1, y)).collect(),
            _ => (0..w).map(|x| self.weight(x, h - 1)).collect(),
        };
        cells.iter().map(|&c| c as f32 / 2.0).sum::<f32>() / cells.len().max(1) as f32
    }

    /// True for the digits 0-9
    pub fn is_digit(&self) -> bool {
        self.symbol.is_ascii_digit()
    }
}

/// Index of the Transit symbol
pub const TRANSIT: usize = 10;
/// Index of the Amount symbol
pub const AMOUNT: usize = 11;
/// Index of the On-Us symbol
pub const ON_US: usize = 12;
/// Index of the Dash symbol
pub const DASH: usize = 13;

/// Templates indexed by raw glyph code
pub const GLYPHS: [GlyphTemplate; GLYPH_COUNT] = [
    GlyphTemplate {
        symbol: '0',
        rows: &[
            "+#####+", "##...##", "##...##", "##...##", "##...##", "##...##", "##...##", "##...##",
            "+#####+",
        ],
    },
    GlyphTemplate {
        symbol: '1',
        rows: &[
            "###...", ".##...", ".##...", ".##...", ".##...", ".##...", "####..", "######",
            "######",
        ],
    },
    GlyphTemplate {
        symbol: '2',
        rows: &[
            "######.", ".....##", ".....##", ".....##", "#######", "##.....", "##.....", "##.....",
            "#######",
        ],
    },
    GlyphTemplate {
        symbol: '3',
        rows: &[
            "######.", ".....##", ".....##", "..#####", "..#####", ".....##", ".....##", ".....##",
            "#######",
        ],
    },
    GlyphTemplate {
        symbol: '4',
        rows: &[
            "##.....", "##.....", "##..##.", "##..##.", "#######", "#######", "....##.", "....##.",
            "....##.",
        ],
    },
    GlyphTemplate {
        symbol: '5',
        rows: &[
            "#######", "##.....", "##.....", "######.", ".....##", ".....##", ".....##", ".....##",
            "######.",
        ],
    },
    GlyphTemplate {
        symbol: '6',
        rows: &[
            "##.....", "##.....", "##.....", "######.", "##...##", "##...##", "##...##", "##...##",
            "#######",
        ],
    },
    GlyphTemplate {
        symbol: '7',
        rows: &[
            "#######", ".....##", "....##.", "...##..", "...##..", "..##...", "..##...", "..##...",
            "..##...",
        ],
    },
    GlyphTemplate {
        symbol: '8',
        rows: &[
            "+#####+", "##...##", "##...##", "+#####+", "+#####+", "##...##", "##...##", "##...##",
            "+#####+",
        ],
    },
    GlyphTemplate {
        symbol: '9',
        rows: &[
            "#######", "##...##", "##...##", "##...##", "#######", ".....##", ".....##", ".....##",
            ".....##",
        ],
    },
    GlyphTemplate {
        symbol: 'A',
        rows: &[
            "...##", "...##", "##...", "##...", "##...", "##...", "##...", "...##", "...##",
        ],
    },
    GlyphTemplate {
        symbol: 'B',
        rows: &[
            "##....", "##....", "##..##", "##..##", "....##", "....##", "##..##", "##....",
            "##....",
        ],
    },
    GlyphTemplate {
        symbol: 'C',
        rows: &[
            "##.##", "##.##", "##.##", "##.##", ".....", ".....", "##...", "##...", "##...",
        ],
    },
    GlyphTemplate {
        symbol: 'D',
        rows: &["##.##.##", "##.##.##", "##.##.##"],
    },
];

/// Template for a text symbol
pub fn glyph_for(symbol: char) -> Option<usize> {
    GLYPHS.iter().position(|g| g.symbol == symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_trimmed_rectangles() {
        for g in &GLYPHS {
            let (w, h) = (g.width(), g.height());
            assert!(g.rows.iter().all(|r| r.len() == w), "{}", g.symbol);
            assert!((0..w).any(|x| g.weight(x, 0) > 0), "{} top", g.symbol);
            assert!((0..w).any(|x| g.weight(x, h - 1) > 0), "{} bottom", g.symbol);
            assert!((0..h).any(|y| g.weight(0, y) > 0), "{} left", g.symbol);
            assert!((0..h).any(|y| g.weight(w - 1, y) > 0), "{} right", g.symbol);
            assert!(w < PITCH_CELLS);
        }
    }

    #[test]
    fn test_digits_share_height() {
        for g in GLYPHS.iter().filter(|g| g.is_digit()) {
            assert_eq!(g.height(), DIGIT_ROWS);
        }
        assert_eq!(glyph_for('C'), Some(ON_US));
        assert_eq!(glyph_for('x'), None);
    }

    #[test]
    fn test_border_levels() {
        // '0' left edge: two gray corners and seven black cells
        let zero = &GLYPHS[0];
        assert!((zero.border_level(0) - 8.0 / 9.0).abs() < 1e-6);
        assert_eq!(GLYPHS[DASH].border_level(1), 6.0 / 8.0);
    }
}
