//! Calendar helpers for the 6-hourly slot cadence.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{CycloneError, CycloneResult};

/// Hours between consecutive time slots.
pub const SLOT_HOURS: i64 = 6;

/// Half-open boundaries `[start, end)` of a calendar month.
///
/// December rolls over into January of the following year.
pub fn month_bounds(year: i32, month: u32) -> CycloneResult<(NaiveDateTime, NaiveDateTime)> {
    let start = first_of_month(year, month)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = first_of_month(next_year, next_month)?;
    Ok((start, end))
}

fn first_of_month(year: i32, month: u32) -> CycloneResult<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or(CycloneError::InvalidMonth { year, month })
}

/// Number of days in a calendar month.
pub fn days_in_month(year: i32, month: u32) -> CycloneResult<u32> {
    let (start, end) = month_bounds(year, month)?;
    Ok((end - start).num_days() as u32)
}

/// Every 6-hourly timestamp in `[month start, next month start)`, in order.
pub fn month_slots(year: i32, month: u32) -> CycloneResult<Vec<NaiveDateTime>> {
    let (start, end) = month_bounds(year, month)?;
    let step = Duration::hours(SLOT_HOURS);

    let mut slots = Vec::with_capacity(((end - start).num_hours() / SLOT_HOURS) as usize);
    let mut t = start;
    while t < end {
        slots.push(t);
        t += step;
    }
    Ok(slots)
}

/// Render a slot timestamp the way the meta files record it.
pub fn slot_label(t: &NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_slot_count_31_day_month() {
        let slots = month_slots(2010, 8).unwrap();
        assert_eq!(slots.len(), 124);
        assert_eq!(slot_label(&slots[0]), "2010-08-01 00:00:00");
        assert_eq!(slot_label(&slots[123]), "2010-08-31 18:00:00");
    }

    #[test]
    fn test_slot_count_february() {
        assert_eq!(month_slots(2010, 2).unwrap().len(), 112);
        assert_eq!(month_slots(2012, 2).unwrap().len(), 116);
        assert_eq!(days_in_month(2000, 2).unwrap(), 29);
        assert_eq!(days_in_month(1900, 2).unwrap(), 28);
    }

    #[test]
    fn test_december_rolls_over() {
        let (start, end) = month_bounds(2015, 12).unwrap();
        assert_eq!(start.year(), 2015);
        assert_eq!(end.year(), 2016);
        assert_eq!(end.month(), 1);
        assert_eq!(end.day(), 1);

        let slots = month_slots(2015, 12).unwrap();
        assert_eq!(slots.len(), 124);
        let last = slots.last().unwrap();
        assert_eq!((last.month(), last.day(), last.hour()), (12, 31, 18));
    }

    #[test]
    fn test_slots_contiguous() {
        let slots = month_slots(2021, 6).unwrap();
        for pair in slots.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::hours(6));
        }
    }

    #[test]
    fn test_invalid_month() {
        assert!(month_bounds(2010, 0).is_err());
        assert!(month_slots(2010, 13).is_err());
    }
}
