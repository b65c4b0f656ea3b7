use std::ops::Range;

use log::trace;

use super::extension::decode_extension;
use super::tables::{
    EAN13_MODULES, L_AND_G_PATTERNS, L_PATTERNS, MIDDLE_PATTERN, PARITY_TO_FIRST_DIGIT,
    START_END_PATTERN,
};
use super::{RowDecoder, RowDetection};
use crate::models::{BarcodeFormat, BitRow};
use crate::scan::pattern::{
    MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE, find_guard_pattern, pattern_variance, record_pattern,
};
use crate::utils::fixed_point::Fixed;

/// EAN-13 reader (UPC-A reads as EAN-13 with a leading 0)
#[derive(Debug, Clone, Copy)]
pub struct Ean13Decoder {
    quiet_zone: bool,
    supplements: bool,
}

impl Default for Ean13Decoder {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Check a full code (check digit last): digits at even distance from the
/// end weigh 3, the others 1, and the sum must be a multiple of 10
pub fn checksum_valid(digits: &[u8]) -> bool {
    if digits.is_empty() || digits.iter().any(|&d| d > 9) {
        return false;
    }
    let length = digits.len();
    let mut sum = 0u32;
    for i in (0..length.saturating_sub(1)).rev().step_by(2) {
        sum += digits[i] as u32;
    }
    sum *= 3;
    for i in (0..length).rev().step_by(2) {
        sum += digits[i] as u32;
    }
    sum % 10 == 0
}

/// Check digit completing `payload` (code without its check digit)
pub fn check_digit(payload: &[u8]) -> u8 {
    let mut sum = 0u32;
    for (i, &d) in payload.iter().rev().enumerate() {
        sum += d as u32 * if i % 2 == 0 { 3 } else { 1 };
    }
    ((10 - sum % 10) % 10) as u8
}

/// Best pattern for the runs at `row_offset`, with its variance
fn decode_digit(
    row: &BitRow,
    counters: &mut [u32; 4],
    row_offset: usize,
    patterns: &[[u32; 4]],
) -> Option<(usize, Fixed)> {
    record_pattern(row, row_offset, counters)?;
    let mut best: Option<(usize, Fixed)> = None;
    for (i, pattern) in patterns.iter().enumerate() {
        let variance = pattern_variance(counters, pattern, MAX_INDIVIDUAL_VARIANCE);
        if variance < MAX_AVG_VARIANCE && best.is_none_or(|(_, v)| variance < v) {
            best = Some((i, variance));
        }
    }
    best
}

struct MainSymbol {
    digits: Vec<u8>,
    start: usize,
    end: usize,
    variance_sum: f32,
}

impl Ean13Decoder {
    /// Decoder with the quiet-zone requirement on or off; add-ons are searched
    pub fn new(quiet_zone: bool) -> Self {
        Self {
            quiet_zone,
            supplements: true,
        }
    }

    /// Enable or disable the EAN-2/EAN-5 add-on search
    pub fn with_supplements(mut self, enabled: bool) -> Self {
        self.supplements = enabled;
        self
    }

    /// Next start guard at or after `from` whose quiet zone is clear
    fn find_start_guard(&self, row: &BitRow, from: usize, limit: usize) -> Option<(usize, usize)> {
        let mut next_start = from;
        while next_start < limit {
            let (start, end) = find_guard_pattern(row, next_start, false, &START_END_PATTERN)?;
            if start >= limit {
                return None;
            }
            let guard_width = end - start;
            if !self.quiet_zone || (start >= guard_width && row.is_range(start - guard_width, start, false)) {
                return Some((start, end));
            }
            next_start = end;
        }
        None
    }

    fn decode_main(&self, row: &BitRow, start_range: (usize, usize), limit: usize) -> Option<MainSymbol> {
        let mut counters = [0u32; 4];
        let mut digits = Vec::with_capacity(13);
        let mut variance_sum = 0f32;
        let mut row_offset = start_range.1;
        let mut lg_pattern = 0usize;

        for x in 0..6 {
            let (best, variance) = decode_digit(row, &mut counters, row_offset, &L_AND_G_PATTERNS)?;
            digits.push((best % 10) as u8);
            if best >= 10 {
                lg_pattern |= 1 << (5 - x);
            }
            variance_sum += variance.to_f32();
            row_offset += counters.iter().sum::<u32>() as usize;
        }

        let first = PARITY_TO_FIRST_DIGIT[lg_pattern];
        if first < 0 {
            trace!("parity signature {lg_pattern:#x} has no leading digit");
            return None;
        }
        digits.insert(0, first as u8);

        let (_, middle_end) = find_guard_pattern(row, row_offset, true, &MIDDLE_PATTERN)?;
        row_offset = middle_end;

        for _ in 0..6 {
            let (best, variance) = decode_digit(row, &mut counters, row_offset, &L_PATTERNS)?;
            digits.push(best as u8);
            variance_sum += variance.to_f32();
            row_offset += counters.iter().sum::<u32>() as usize;
        }

        let (end_start, end) = find_guard_pattern(row, row_offset, false, &START_END_PATTERN)?;
        if end_start != row_offset || end > limit {
            return None;
        }
        if self.quiet_zone {
            let quiet_end = end + (end - end_start);
            if quiet_end > row.size() || !row.is_range(end, quiet_end, false) {
                return None;
            }
        }
        if !checksum_valid(&digits) {
            trace!("checksum failed for {digits:?}");
            return None;
        }

        Some(MainSymbol {
            digits,
            start: start_range.0,
            end,
            variance_sum,
        })
    }
}

impl RowDecoder for Ean13Decoder {
    fn format(&self) -> BarcodeFormat {
        BarcodeFormat::Ean13
    }

    fn decode_row(&self, row: &BitRow, range: Range<usize>, max_results: usize) -> Vec<RowDetection> {
        let mut found = Vec::new();
        let limit = range.end.min(row.size());
        let mut from = range.start;

        while found.len() < max_results && from < limit {
            let Some(start_range) = self.find_start_guard(row, from, limit) else {
                break;
            };
            let Some(main) = self.decode_main(row, start_range, limit) else {
                // retry from the second bar of this guard
                from = row.next_unset(start_range.0).max(start_range.0 + 1);
                continue;
            };

            let module = (main.end - main.start) as f32 / EAN13_MODULES as f32;
            let supplement = if self.supplements {
                let roi_start = main.end + module.round().max(1.0) as usize;
                let roi_end = (main.end + (main.end - main.start)).min(limit);
                decode_extension(row, roi_start..roi_end)
            } else {
                None
            };

            let avg_variance = main.variance_sum / 12.0;
            let confidence = (1.0 - avg_variance / MAX_AVG_VARIANCE.to_f32()).clamp(0.0, 1.0);
            found.push(RowDetection {
                value: main.digits.iter().map(|d| char::from(b'0' + d)).collect(),
                raw: main.digits.iter().map(|&d| d as i32).collect(),
                x_start: main.start,
                x_end: main.end,
                format: BarcodeFormat::Ean13,
                confidence,
                supplement,
            });
            from = main.end;
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::synth::ean13_modules;

    fn digits(s: &str) -> Vec<u8> {
        s.bytes().map(|b| b - b'0').collect()
    }

    fn render_row(code: &str, supplement: Option<&str>, module: usize, quiet: usize) -> BitRow {
        let modules = ean13_modules(code, supplement).unwrap();
        let mut bits = vec![false; quiet * module];
        for m in modules {
            bits.extend(std::iter::repeat_n(m, module));
        }
        bits.extend(std::iter::repeat_n(false, quiet * module));
        BitRow::from_bools(&bits)
    }

    #[test]
    fn test_checksum_accepts_known_code() {
        assert!(checksum_valid(&digits("4006381333931")));
        assert_eq!(check_digit(&digits("400638133393")), 1);
    }

    #[test]
    fn test_checksum_rejects_every_single_digit_mutation() {
        let good = digits("4006381333931");
        for i in 0..good.len() {
            for d in 0..10u8 {
                if d == good[i] {
                    continue;
                }
                let mut bad = good.clone();
                bad[i] = d;
                assert!(!checksum_valid(&bad), "mutation {i}->{d}");
            }
        }
    }

    #[test]
    fn test_decode_synthetic_row() {
        let row = render_row("4006381333931", None, 2, 12);
        let decoder = Ean13Decoder::new(true);
        let found = decoder.decode_row(&row, 0..row.size(), 4);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "4006381333931");
        assert_eq!(found[0].x_start, 24);
        assert_eq!(found[0].x_end, 24 + 95 * 2);
        assert!(found[0].confidence > 0.99);
        assert_eq!(found[0].supplement, None);
    }

    #[test]
    fn test_every_leading_digit_decodes() {
        for code in ["0123456789012", "5901234123457", "9780306406157", "7622210449283"] {
            let row = render_row(code, None, 3, 10);
            let found = Ean13Decoder::new(true).decode_row(&row, 0..row.size(), 1);
            assert_eq!(found.first().map(|d| d.value.as_str()), Some(code));
        }
    }

    #[test]
    fn test_quiet_zone_requirement() {
        let row = render_row("4006381333931", None, 2, 1);
        assert!(Ean13Decoder::new(true).decode_row(&row, 0..row.size(), 1).is_empty());
        assert_eq!(Ean13Decoder::new(false).decode_row(&row, 0..row.size(), 1).len(), 1);
    }

    #[test]
    fn test_reads_supplements() {
        let row = render_row("9780306406157", Some("51299"), 2, 12);
        let found = Ean13Decoder::new(true).decode_row(&row, 0..row.size(), 1);
        assert_eq!(found[0].supplement.as_deref(), Some("51299"));

        let row = render_row("9780306406157", Some("12"), 2, 12);
        let found = Ean13Decoder::new(true).decode_row(&row, 0..row.size(), 1);
        assert_eq!(found[0].supplement.as_deref(), Some("12"));
    }

    #[test]
    fn test_blank_row_has_no_detection() {
        let row = BitRow::new(300);
        assert!(Ean13Decoder::default().decode_row(&row, 0..300, 1).is_empty());
    }
}
