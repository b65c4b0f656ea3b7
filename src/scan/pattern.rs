//! Run-length pattern helpers shared by the 1D decoders.

use crate::models::BitRow;
use crate::utils::fixed_point::{Fixed, SHIFT};

/// Average per-module variance accepted for a whole pattern
pub const MAX_AVG_VARIANCE: Fixed = Fixed::from_ratio(48, 100);
/// Per-module variance accepted for any single bar or space
pub const MAX_INDIVIDUAL_VARIANCE: Fixed = Fixed::from_ratio(70, 100);

/// Variance of observed run widths against a module pattern, in fixed point.
///
/// Observed widths are scaled to the pattern's total module count with a
/// shift-based unit width. Returns `Fixed::MAX` when the runs are too short
/// or any single run is off by more than `max_individual_variance` modules.
pub fn pattern_variance(counters: &[u32], pattern: &[u32], max_individual_variance: Fixed) -> Fixed {
    let total: u32 = counters.iter().sum();
    let pattern_length: u32 = pattern.iter().sum();
    if total < pattern_length || pattern_length == 0 {
        return Fixed::MAX;
    }

    let unit_bar_width = (total << SHIFT) / pattern_length;
    let max_individual = (max_individual_variance.raw() * unit_bar_width) >> SHIFT;

    let mut total_variance = 0u32;
    for (&counter, &expected) in counters.iter().zip(pattern) {
        let counter = counter << SHIFT;
        let scaled = expected * unit_bar_width;
        let variance = counter.abs_diff(scaled);
        if variance > max_individual {
            return Fixed::MAX;
        }
        total_variance += variance;
    }
    Fixed::from_raw(total_variance / total)
}

/// Fill `counters` with the run lengths starting at `start`.
///
/// Fails when the row ends before every counter got a run; the last run may
/// end at the row end.
pub fn record_pattern(row: &BitRow, start: usize, counters: &mut [u32]) -> Option<()> {
    counters.fill(0);
    let end = row.size();
    if start >= end {
        return None;
    }
    let mut is_white = !row.get(start);
    let mut counter_position = 0;
    let mut i = start;
    while i < end {
        if row.get(i) != is_white {
            counters[counter_position] += 1;
        } else {
            counter_position += 1;
            if counter_position == counters.len() {
                break;
            }
            counters[counter_position] = 1;
            is_white = !is_white;
        }
        i += 1;
    }
    if counter_position == counters.len() || (counter_position == counters.len() - 1 && i == end) {
        Some(())
    } else {
        None
    }
}

/// Locate `pattern` (bars and spaces alternating) starting the search at
/// `row_offset`. Returns `[start, end)` of the match.
pub fn find_guard_pattern(row: &BitRow, row_offset: usize, white_first: bool, pattern: &[u32]) -> Option<(usize, usize)> {
    let width = row.size();
    let mut counters = vec![0u32; pattern.len()];
    let mut row_offset = if white_first {
        row.next_unset(row_offset)
    } else {
        row.next_set(row_offset)
    };
    let mut counter_position = 0;
    let mut pattern_start = row_offset;
    let mut is_white = white_first;

    while row_offset < width {
        if row.get(row_offset) != is_white {
            counters[counter_position] += 1;
        } else {
            if counter_position == pattern.len() - 1 {
                if pattern_variance(&counters, pattern, MAX_INDIVIDUAL_VARIANCE) < MAX_AVG_VARIANCE {
                    return Some((pattern_start, row_offset));
                }
                pattern_start += (counters[0] + counters[1]) as usize;
                counters.copy_within(2.., 0);
                let n = counters.len();
                counters[n - 2] = 0;
                counters[n - 1] = 0;
                counter_position -= 1;
            } else {
                counter_position += 1;
            }
            counters[counter_position] = 1;
            is_white = !is_white;
        }
        row_offset += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_from(pattern: &str) -> BitRow {
        let bits: Vec<bool> = pattern.chars().map(|c| c == '1').collect();
        BitRow::from_bools(&bits)
    }

    #[test]
    fn test_exact_pattern_has_zero_variance() {
        let v = pattern_variance(&[6, 4, 2, 2], &[3, 2, 1, 1], MAX_INDIVIDUAL_VARIANCE);
        assert_eq!(v.raw(), 0);
    }

    #[test]
    fn test_off_pattern_is_rejected() {
        let v = pattern_variance(&[2, 2, 2, 8], &[3, 2, 1, 1], MAX_INDIVIDUAL_VARIANCE);
        assert_eq!(v, Fixed::MAX);
        assert_eq!(pattern_variance(&[1, 1], &[3, 2], MAX_INDIVIDUAL_VARIANCE), Fixed::MAX);
    }

    #[test]
    fn test_record_pattern_runs() {
        let row = row_from("0011100011");
        let mut counters = [0u32; 4];
        assert!(record_pattern(&row, 0, &mut counters).is_some());
        assert_eq!(counters, [2, 3, 3, 2]);
        let mut five = [0u32; 5];
        assert!(record_pattern(&row, 0, &mut five).is_none());
    }

    #[test]
    fn test_find_start_guard() {
        let row = row_from("0000001100110000");
        let found = find_guard_pattern(&row, 0, false, &[1, 1, 1]);
        assert_eq!(found, Some((6, 12)));
    }
}
