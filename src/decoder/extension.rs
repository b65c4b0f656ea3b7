use std::ops::Range;

use log::trace;

use super::tables::{CHECK_DIGIT_ENCODINGS, EXTENSION_START_PATTERN, L_AND_G_PATTERNS};
use crate::models::BitRow;
use crate::scan::pattern::{
    MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE, find_guard_pattern, pattern_variance, record_pattern,
};

/// EAN-5 check value: alternate weights 3 and 9 from the right, mod 10
pub fn ean5_checksum(digits: &[u8]) -> u8 {
    let length = digits.len();
    let mut sum = 0u32;
    for i in (0..length.saturating_sub(1)).rev().step_by(2) {
        sum += digits[i] as u32;
    }
    sum *= 3;
    for i in (0..length).rev().step_by(2) {
        sum += digits[i] as u32;
    }
    sum *= 3;
    (sum % 10) as u8
}

/// Parity pattern (bit 1 = first digit, 1 = G) of an EAN-2 value
pub fn ean2_parity(value: u32) -> u32 {
    value % 4
}

/// Read `count` add-on digits after the start guard ending at `row_offset`.
/// Returns digits and the L/G signature (first digit in the high bit).
fn read_digits(row: &BitRow, mut row_offset: usize, count: usize, limit: usize) -> Option<(Vec<u8>, u32)> {
    let mut counters = [0u32; 4];
    let mut digits = Vec::with_capacity(count);
    let mut lg_pattern = 0u32;

    for x in 0..count {
        if row_offset >= limit {
            return None;
        }
        record_pattern(row, row_offset, &mut counters)?;
        let mut best: Option<(usize, u32)> = None;
        for (i, pattern) in L_AND_G_PATTERNS.iter().enumerate() {
            let variance = pattern_variance(&counters, pattern, MAX_INDIVIDUAL_VARIANCE);
            if variance < MAX_AVG_VARIANCE && best.is_none_or(|(_, v)| variance.raw() < v) {
                best = Some((i, variance.raw()));
            }
        }
        let (best, _) = best?;
        digits.push((best % 10) as u8);
        if best >= 10 {
            lg_pattern |= 1 << (count - 1 - x);
        }
        row_offset += counters.iter().sum::<u32>() as usize;
        if x != count - 1 {
            // skip the space + bar separator
            row_offset = row.next_set(row_offset);
            row_offset = row.next_unset(row_offset);
        }
    }
    Some((digits, lg_pattern))
}

fn to_text(digits: &[u8]) -> String {
    digits.iter().map(|d| char::from(b'0' + d)).collect()
}

fn decode_ean5(row: &BitRow, row_offset: usize, limit: usize) -> Option<String> {
    let (digits, lg_pattern) = read_digits(row, row_offset, 5, limit)?;
    let check = CHECK_DIGIT_ENCODINGS.iter().position(|&e| e as u32 == lg_pattern)?;
    if check as u8 != ean5_checksum(&digits) {
        trace!("EAN-5 add-on {digits:?} failed its check");
        return None;
    }
    Some(to_text(&digits))
}

fn decode_ean2(row: &BitRow, row_offset: usize, limit: usize) -> Option<String> {
    let (digits, lg_pattern) = read_digits(row, row_offset, 2, limit)?;
    let value = digits[0] as u32 * 10 + digits[1] as u32;
    if ean2_parity(value) != lg_pattern {
        return None;
    }
    Some(to_text(&digits))
}

/// Look for an EAN-5 or EAN-2 add-on starting inside `roi`
pub fn decode_extension(row: &BitRow, roi: Range<usize>) -> Option<String> {
    if roi.start >= roi.end {
        return None;
    }
    let (start, end) = find_guard_pattern(row, roi.start, false, &EXTENSION_START_PATTERN)?;
    if start >= roi.end {
        return None;
    }
    let limit = row.size();
    decode_ean5(row, end, limit).or_else(|| decode_ean2(row, end, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::synth::extension_modules;

    fn render(text: &str, module: usize) -> BitRow {
        let mut bits = vec![false; 10 * module];
        for m in extension_modules(text).unwrap() {
            bits.extend(std::iter::repeat_n(m, module));
        }
        bits.extend(std::iter::repeat_n(false, 10 * module));
        BitRow::from_bools(&bits)
    }

    #[test]
    fn test_ean5_checksum() {
        // 5 1 2 9 9: (5 + 2 + 9) * 3 + (1 + 9) * 9 = 138 -> 8
        assert_eq!(ean5_checksum(&[5, 1, 2, 9, 9]), 8);
    }

    #[test]
    fn test_decode_ean5_and_ean2() {
        let row = render("52495", 2);
        assert_eq!(decode_extension(&row, 0..row.size()).as_deref(), Some("52495"));
        let row = render("07", 3);
        assert_eq!(decode_extension(&row, 0..row.size()).as_deref(), Some("07"));
    }

    #[test]
    fn test_roi_must_contain_guard() {
        let row = render("52495", 2);
        assert_eq!(decode_extension(&row, 0..10), None);
    }
}
