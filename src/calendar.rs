// src/calendar.rs
use chrono::{Datelike, Days, NaiveDate};
use std::collections::BTreeSet;

/// Cells in a five-week month view.
pub const GRID_CELLS: usize = 35;
const SIX_WEEK_CELLS: usize = 42;

/// Sunday-first month view. Leading/trailing padding cells are `None`.
/// The grid has 35 cells, or 42 when the month spans six weeks.
#[must_use]
pub fn month_grid(year: i32, month: u32) -> Vec<Option<NaiveDate>> {
    let Some((first, last)) = month_bounds(year, month) else {
        return Vec::new();
    };
    let leading = first.weekday().num_days_from_sunday() as usize;
    let mut cells: Vec<Option<NaiveDate>> = vec![None; leading];
    cells.extend(first.iter_days().take_while(|d| *d <= last).map(Some));

    let target = if cells.len() > GRID_CELLS {
        SIX_WEEK_CELLS
    } else {
        GRID_CELLS
    };
    cells.resize(target, None);
    cells
}

/// First and last day of a month; `None` for an invalid month.
#[must_use]
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next_first.pred_opt()?))
}

/// Sunday through Saturday of the week containing `date`, clamped to the
/// representable calendar.
#[must_use]
pub fn week_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let back = Days::new(u64::from(date.weekday().num_days_from_sunday()));
    let start = date.checked_sub_days(back).unwrap_or(NaiveDate::MIN);
    let end = start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
    (start, end)
}

/// The `days`-day window ending on `end` (inclusive). Windows reaching past
/// the earliest representable date start at `NaiveDate::MIN`.
#[must_use]
pub fn trailing_range(end: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let span = Days::new(u64::from(days.max(1) - 1));
    (end.checked_sub_days(span).unwrap_or(NaiveDate::MIN), end)
}

/// Distinct dates carrying at least one record, for calendar markers.
pub fn dates_with_records<I>(dates: I) -> BTreeSet<NaiveDate>
where
    I: IntoIterator<Item = NaiveDate>,
{
    dates.into_iter().collect()
}

/// Steps a (year, month) pair by `delta` months.
#[must_use]
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}
