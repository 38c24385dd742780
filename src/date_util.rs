use chrono::{Datelike, NaiveDate};

/// Number of monthly (target, achieved) pairs in a plan row.
pub const MONTHS_PER_YEAR: usize = 12;

/// Get the quarter (1-4) for a given date.
pub fn quarter_of(d: NaiveDate) -> u8 {
    ((d.month() - 1) / 3 + 1) as u8
}

/// 0-based month indices covered by a quarter (1-4).
pub fn quarter_months(quarter: u8) -> [usize; 3] {
    let first = (quarter.clamp(1, 4) as usize - 1) * 3;
    [first, first + 1, first + 2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_of() {
        assert_eq!(quarter_of(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()), 1);
        assert_eq!(quarter_of(NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()), 1);
        assert_eq!(quarter_of(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()), 2);
        assert_eq!(quarter_of(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()), 3);
        assert_eq!(
            quarter_of(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()),
            4
        );
    }

    #[test]
    fn test_quarter_months() {
        assert_eq!(quarter_months(1), [0, 1, 2]);
        assert_eq!(quarter_months(2), [3, 4, 5]);
        assert_eq!(quarter_months(3), [6, 7, 8]);
        assert_eq!(quarter_months(4), [9, 10, 11]);
    }
}
