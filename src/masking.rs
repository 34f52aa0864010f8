use crate::dates::{resolve_dates, CalendarDate};
use crate::error::{ensure_same_len, Result};

/// Blank values by date ahead of interpolation.
///
/// With `outside_to_nan == false` every value dated within `[start, end]`
/// (inclusive) becomes NaN and the rest are copied. With `true` the window is
/// kept and everything outside it becomes NaN. The input is never modified.
pub fn mask_dates_for_interpolation<D, S, E>(
    dates: &[D],
    values: &[f64],
    start: S,
    end: E,
    outside_to_nan: bool,
) -> Result<Vec<f64>>
where
    D: CalendarDate,
    S: CalendarDate,
    E: CalendarDate,
{
    ensure_same_len(dates.len(), values.len())?;
    let start = start.to_calendar_date()?;
    let end = end.to_calendar_date()?;
    let dates = resolve_dates(dates)?;

    let masked = dates
        .iter()
        .zip(values)
        .map(|(date, &value)| {
            let in_window = *date >= start && *date <= end;
            if in_window != outside_to_nan {
                f64::NAN
            } else {
                value
            }
        })
        .collect();

    Ok(masked)
}
