//! Conversion of break indices into fractional calendar years.
//!
//! A break index is a 1-based position into the monitoring date series;
//! negative values mean "no break". The decimal year of a date is
//! `year + (day_of_year - 1) / 365`.
//!
//! The denominator is fixed at 365 and ignores leap years. Outputs produced
//! by earlier runs depend on this exact constant, so it must not change.

use chrono::{Datelike, NaiveDate};

/// Denominator used for the fractional part of a decimal year.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Break index reported when no break was detected.
pub const NO_BREAK: i32 = -1;

/// Decimal year of a single date.
pub fn decimal_year(date: NaiveDate) -> f64 {
    date.year() as f64 + (date.ordinal() as f64 - 1.0) / DAYS_PER_YEAR
}

/// Convert one break index into a decimal year.
///
/// Returns NaN for the negative "no break" sentinel and for indices that
/// fall outside `dates` (including 0).
pub fn break_to_decimal_year(index: i32, dates: &[NaiveDate]) -> f32 {
    if index < 1 {
        return f32::NAN;
    }
    dates
        .get(index as usize - 1)
        .map(|d| decimal_year(*d) as f32)
        .unwrap_or(f32::NAN)
}

/// Convert a whole window of break indices into decimal years.
///
/// The decimal year of every monitoring date is computed once, so the
/// per-pixel work is a single table lookup.
pub fn to_decimal_years(indices: &[i32], dates: &[NaiveDate]) -> Vec<f32> {
    let table: Vec<f32> = dates.iter().map(|d| decimal_year(*d) as f32).collect();

    indices
        .iter()
        .map(|&i| {
            usize::try_from(i)
                .ok()
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| table.get(i).copied())
                .unwrap_or(f32::NAN)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily_series(start: NaiveDate, len: usize) -> Vec<NaiveDate> {
        (0..len)
            .map(|i| start + chrono::Duration::days(7 * i as i64))
            .collect()
    }

    #[test]
    fn test_mid_year_literal() {
        let dates = [date(2015, 7, 2)];
        let expected = (2015.0 + 182.0 / 365.0) as f32;
        assert_eq!(break_to_decimal_year(1, &dates), expected);
    }

    #[test]
    fn test_first_of_january_is_integral() {
        let dates = [date(2019, 1, 1)];
        assert_eq!(break_to_decimal_year(1, &dates), 2019.0);
    }

    #[test]
    fn test_leap_year_uses_fixed_denominator() {
        // Day 366 of a leap year lands past the next integral year.
        let dates = [date(2020, 12, 31)];
        let expected = (2020.0 + 365.0 / 365.0) as f32;
        assert_eq!(break_to_decimal_year(1, &dates), expected);
    }

    #[test]
    fn test_zero_and_out_of_range_are_nan() {
        let dates = [date(2015, 1, 1), date(2015, 2, 1)];
        assert!(break_to_decimal_year(0, &dates).is_nan());
        assert!(break_to_decimal_year(3, &dates).is_nan());
    }

    #[test]
    fn test_vectorized_matches_scalar() {
        let dates = daily_series(date(2016, 3, 1), 12);
        let indices = [-2, -1, 0, 1, 5, 12, 13];
        let vectorized = to_decimal_years(&indices, &dates);

        for (i, value) in indices.iter().zip(vectorized.iter()) {
            let scalar = break_to_decimal_year(*i, &dates);
            assert!(
                (scalar.is_nan() && value.is_nan()) || scalar == *value,
                "index {} differs: {} vs {}",
                i,
                scalar,
                value
            );
        }
    }

    proptest! {
        #[test]
        fn prop_negative_index_is_nan(index in i32::MIN..0, len in 1usize..50) {
            let dates = daily_series(date(2000, 1, 1), len);
            prop_assert!(break_to_decimal_year(index, &dates).is_nan());
        }

        #[test]
        fn prop_monotonic_over_series(len in 2usize..200, offset in 0i64..3000) {
            let dates = daily_series(date(2000, 1, 1) + chrono::Duration::days(offset), len);
            let values: Vec<f32> = (1..=len as i32)
                .map(|i| break_to_decimal_year(i, &dates))
                .collect();
            for pair in values.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
        }
    }
}
