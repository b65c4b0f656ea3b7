//! EAN/UPC module tables.
//!
//! Digit patterns are run widths in modules, starting with a space for the
//! left-hand (L/G) sets. The right-hand set reuses the L widths with the
//! colors swapped.

/// Start and end guard: bar, space, bar
pub const START_END_PATTERN: [u32; 3] = [1, 1, 1];
/// Middle guard, space first
pub const MIDDLE_PATTERN: [u32; 5] = [1, 1, 1, 1, 1];
/// Add-on start guard
pub const EXTENSION_START_PATTERN: [u32; 3] = [1, 1, 2];
/// Add-on separator between digits (space, bar)
pub const EXTENSION_SEPARATOR: [u32; 2] = [1, 1];

/// Odd-parity (L) digit patterns
pub const L_PATTERNS: [[u32; 4]; 10] = [
    [3, 2, 1, 1], // 0
    [2, 2, 2, 1], // 1
    [2, 1, 2, 2], // 2
    [1, 4, 1, 1], // 3
    [1, 1, 3, 2], // 4
    [1, 2, 3, 1], // 5
    [1, 1, 1, 4], // 6
    [1, 3, 1, 2], // 7
    [1, 2, 1, 3], // 8
    [3, 1, 1, 2], // 9
];

/// L patterns followed by the even-parity (G) patterns, which are the L
/// widths reversed. Index 10 + d is G for digit d.
pub const L_AND_G_PATTERNS: [[u32; 4]; 20] = build_l_and_g();

const fn build_l_and_g() -> [[u32; 4]; 20] {
    let mut out = [[0u32; 4]; 20];
    let mut i = 0;
    while i < 10 {
        let l = L_PATTERNS[i];
        out[i] = l;
        out[i + 10] = [l[3], l[2], l[1], l[0]];
        i += 1;
    }
    out
}

/// Parity of the six left digits (bit 5 = first, 1 = G) for each implied
/// leading digit
pub const FIRST_DIGIT_ENCODINGS: [u8; 10] = [0x00, 0x0B, 0x0D, 0x0E, 0x13, 0x19, 0x1C, 0x15, 0x16, 0x1A];

/// Leading digit for each 6-bit parity signature, -1 when invalid
pub const PARITY_TO_FIRST_DIGIT: [i8; 64] = build_parity_table();

const fn build_parity_table() -> [i8; 64] {
    let mut out = [-1i8; 64];
    let mut d = 0;
    while d < 10 {
        out[FIRST_DIGIT_ENCODINGS[d] as usize] = d as i8;
        d += 1;
    }
    out
}

/// EAN-5 parity (bit 4 = first digit) for each check value
pub const CHECK_DIGIT_ENCODINGS: [u8; 10] = [0x18, 0x14, 0x12, 0x11, 0x0C, 0x06, 0x03, 0x0A, 0x09, 0x05];

/// Total modules of an EAN-13 symbol without quiet zones
pub const EAN13_MODULES: usize = 95;
