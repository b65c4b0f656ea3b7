//! Synthetic symbol renderers for tests, benches and the CLI.

use crate::decoder::ean13::{check_digit, checksum_valid};
use crate::decoder::extension::{ean2_parity, ean5_checksum};
use crate::decoder::tables::{
    CHECK_DIGIT_ENCODINGS, EXTENSION_SEPARATOR, EXTENSION_START_PATTERN, FIRST_DIGIT_ENCODINGS,
    L_PATTERNS, MIDDLE_PATTERN, START_END_PATTERN,
};
use crate::micr::glyphs::{DIGIT_ROWS, GLYPHS, GlyphTemplate, PITCH_CELLS, glyph_for};
use crate::models::GrayImage;

/// Quiet zone on each side of a rendered EAN symbol, in modules
pub const EAN_QUIET_MODULES: usize = 12;
/// White rows above and below rendered bars
pub const EAN_MARGIN_PX: usize = 10;
/// Gap between an EAN-13 symbol and its add-on, in modules
pub const SUPPLEMENT_GAP_MODULES: usize = 9;

fn parse_digits(text: &str) -> Option<Vec<u8>> {
    text.bytes()
        .map(|b| b.is_ascii_digit().then(|| b - b'0'))
        .collect()
}

/// Append runs of alternating color, starting with `black`
fn push_runs(modules: &mut Vec<bool>, widths: &[u32], mut black: bool) {
    for &w in widths {
        modules.extend(std::iter::repeat_n(black, w as usize));
        black = !black;
    }
}

fn push_digit(modules: &mut Vec<bool>, digit: u8, even_parity: bool, black_first: bool) {
    let mut widths = L_PATTERNS[digit as usize];
    if even_parity {
        widths.reverse();
    }
    push_runs(modules, &widths, black_first);
}

/// Module bits of an EAN-2 or EAN-5 add-on (start guard first)
pub fn extension_modules(text: &str) -> Option<Vec<bool>> {
    let digits = parse_digits(text)?;
    let parity = match digits.len() {
        5 => CHECK_DIGIT_ENCODINGS[ean5_checksum(&digits) as usize] as u32,
        2 => ean2_parity(digits[0] as u32 * 10 + digits[1] as u32),
        _ => return None,
    };
    let count = digits.len();
    let mut modules = Vec::new();
    push_runs(&mut modules, &EXTENSION_START_PATTERN, true);
    for (x, &d) in digits.iter().enumerate() {
        if x > 0 {
            push_runs(&mut modules, &EXTENSION_SEPARATOR, false);
        }
        let even = (parity >> (count - 1 - x)) & 1 == 1;
        push_digit(&mut modules, d, even, false);
    }
    Some(modules)
}

/// Module bits of an EAN-13 symbol, guard to guard, optionally followed by
/// an add-on. `code` holds 12 digits (check digit appended) or 13 digits
/// with a valid check digit.
pub fn ean13_modules(code: &str, supplement: Option<&str>) -> Option<Vec<bool>> {
    let mut digits = parse_digits(code)?;
    match digits.len() {
        12 => digits.push(check_digit(&digits)),
        13 if checksum_valid(&digits) => {}
        _ => return None,
    }

    let parity = FIRST_DIGIT_ENCODINGS[digits[0] as usize];
    let mut modules = Vec::with_capacity(95);
    push_runs(&mut modules, &START_END_PATTERN, true);
    for (x, &d) in digits[1..7].iter().enumerate() {
        let even = (parity >> (5 - x)) & 1 == 1;
        push_digit(&mut modules, d, even, false);
    }
    push_runs(&mut modules, &MIDDLE_PATTERN, false);
    for &d in &digits[7..] {
        push_digit(&mut modules, d, false, true);
    }
    push_runs(&mut modules, &START_END_PATTERN, true);

    if let Some(text) = supplement {
        modules.extend(std::iter::repeat_n(false, SUPPLEMENT_GAP_MODULES));
        modules.extend(extension_modules(text)?);
    }
    Some(modules)
}

/// Gray image of an EAN-13 symbol: black bars `bar_height` px tall,
/// `module` px per module, with quiet zones and white margins
pub fn render_ean13(code: &str, supplement: Option<&str>, module: usize, bar_height: usize) -> Option<GrayImage> {
    let modules = ean13_modules(code, supplement)?;
    let module = module.max(1);
    let width = (modules.len() + 2 * EAN_QUIET_MODULES) * module;
    let height = bar_height + 2 * EAN_MARGIN_PX;
    let mut image = GrayImage::filled(width, height, 255);
    for (i, &black) in modules.iter().enumerate() {
        if black {
            let x = (EAN_QUIET_MODULES + i) * module;
            image.fill_rect(x, EAN_MARGIN_PX, x + module, EAN_MARGIN_PX + bar_height, 0);
        }
    }
    Some(image)
}

/// Paint one glyph with `cell` px cells at (x0, y0); gray cells become a
/// checkerboard
pub fn paint_glyph(template: &GlyphTemplate, cell: usize, x0: usize, y0: usize, set: &mut dyn FnMut(usize, usize)) {
    for ty in 0..template.height() {
        for tx in 0..template.width() {
            let weight = template.weight(tx, ty);
            if weight == 0 {
                continue;
            }
            for ly in 0..cell {
                for lx in 0..cell {
                    if weight == 2 || (lx + ly) % 2 == 0 {
                        set(x0 + tx * cell + lx, y0 + ty * cell + ly);
                    }
                }
            }
        }
    }
}

/// Paint a MICR line starting at (x0, y0). Every symbol gets a slot of
/// `PITCH_CELLS` cells with the glyph centered in it; spaces and symbols
/// without a template leave the slot blank.
pub fn paint_micr_line(text: &str, cell: usize, x0: usize, y0: usize, set: &mut dyn FnMut(usize, usize)) {
    let pitch = PITCH_CELLS * cell;
    for (i, symbol) in text.chars().enumerate() {
        let Some(glyph) = glyph_for(symbol) else {
            continue;
        };
        let template = &GLYPHS[glyph];
        let dx = (PITCH_CELLS - template.width()) * cell / 2;
        let dy = (DIGIT_ROWS - template.height()) * cell / 2;
        paint_glyph(template, cell, x0 + i * pitch + dx, y0 + dy, set);
    }
}

/// Gray image of a MICR line with a five-cell white margin
pub fn render_micr_line(text: &str, cell: usize) -> GrayImage {
    let cell = cell.max(1);
    let margin = 5 * cell;
    let width = 2 * margin + text.chars().count() * PITCH_CELLS * cell;
    let height = DIGIT_ROWS * cell + 2 * margin;
    let mut image = GrayImage::filled(width, height, 255);
    paint_micr_line(text, cell, margin, margin, &mut |x, y| image.set(x, y, 0));
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PixelSource;

    #[test]
    fn test_ean13_layout() {
        let modules = ean13_modules("400638133393", None).unwrap();
        assert_eq!(modules.len(), 95);
        assert_eq!(&modules[..3], &[true, false, true]);
        assert_eq!(&modules[45..50], &[false, true, false, true, false]);
        assert_eq!(&modules[92..], &[true, false, true]);
        assert_eq!(ean13_modules("4006381333939", None), None);
        assert_eq!(ean13_modules("40063813339x", None), None);
    }

    #[test]
    fn test_supplement_layout() {
        let modules = ean13_modules("4006381333931", Some("12")).unwrap();
        assert_eq!(modules.len(), 95 + 9 + 4 + 7 + 2 + 7);
        assert_eq!(&modules[104..108], &[true, false, true, true]);
        assert_eq!(ean13_modules("4006381333931", Some("123")), None);
    }

    #[test]
    fn test_micr_render_size() {
        let image = render_micr_line("0 1", 4);
        assert_eq!(image.width(), 40 + 3 * 36);
        assert_eq!(image.height(), 76);
        // '0' starts one cell into its slot, top-left corner is gray
        assert_eq!(image.pixel(24, 20), 0);
        assert_eq!(image.pixel(25, 20), 255);
        assert_eq!(image.pixel(28, 20), 0);
    }
}
