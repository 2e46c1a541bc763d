//! Business-day calendar (Monday to Friday, no holidays) and resampling.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// `date` itself if it is a business day, otherwise the following Monday.
pub fn next_business_day(date: NaiveDate) -> NaiveDate {
    let mut d = date;
    while !is_business_day(d) {
        d += Duration::days(1);
    }
    d
}

/// Infinite iterator of business days starting at `start` (rolled forward).
pub fn business_days_from(start: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let mut next = next_business_day(start);
    std::iter::from_fn(move || {
        let current = next;
        next = next_business_day(current + Duration::days(1));
        Some(current)
    })
}

/// Resample observations onto business days.
///
/// The output covers every business day from the first observation (rolled
/// forward to a business day) through the last observation (rolled forward
/// likewise). Each output value is the last non-NaN observation dated on or
/// before that business day; days before any valid observation are NaN.
/// Weekend observations therefore surface on the following Monday.
pub fn resample_to_business_days(
    index: &[NaiveDate],
    values: &[f64],
) -> (Vec<NaiveDate>, Vec<f64>) {
    let (Some(&first), Some(&last)) = (index.first(), index.last()) else {
        return (Vec::new(), Vec::new());
    };
    let end = next_business_day(last);

    let mut out_index = Vec::new();
    let mut out_values = Vec::new();
    let mut j = 0;
    let mut current = f64::NAN;

    for day in business_days_from(first).take_while(|d| *d <= end) {
        while j < index.len() && index[j] <= day {
            if !values[j].is_nan() {
                current = values[j];
            }
            j += 1;
        }
        out_index.push(day);
        out_values.push(current);
    }

    (out_index, out_values)
}
