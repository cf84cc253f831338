use chrono::{Duration, NaiveDate};
use error_stack::{Report, bail};

use crate::error::WindowError;
use crate::model::{PeriodToken, Series, Window, year_start};

/// Slice a series to the requested window.
///
/// Relative tokens resolve against the series' own maximum date, never
/// wall-clock time, so the result is deterministic for a fixed series.
/// A legitimately empty window is `Ok` with an empty series; only an
/// inverted explicit range is an error.
pub fn select(series: &Series, window: &Window) -> Result<Series, Report<WindowError>> {
    match window {
        Window::Range { start, end } => {
            if start > end {
                bail!(WindowError::InvalidRange {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
            Ok(filter_range(series, *start, *end))
        }
        Window::Period(token) => Ok(select_period(series, *token)),
    }
}

fn filter_range(series: &Series, start: NaiveDate, end: NaiveDate) -> Series {
    let bars = series
        .bars
        .iter()
        .filter(|b| start <= b.date && b.date <= end)
        .cloned()
        .collect();
    Series::new(series.symbol.clone(), bars)
}

fn select_period(series: &Series, token: PeriodToken) -> Series {
    let Some(max_date) = series.last_date() else {
        return Series::new(series.symbol.clone(), Vec::new());
    };

    match token {
        PeriodToken::Max => series.clone(),
        // Last 5 bars, not 5 calendar days
        PeriodToken::FiveDays => {
            let skip = series.len().saturating_sub(5);
            Series::new(series.symbol.clone(), series.bars[skip..].to_vec())
        }
        PeriodToken::YearToDate => filter_range(series, year_start(max_date), max_date),
        PeriodToken::OneMonth => trailing_days(series, max_date, 30),
        PeriodToken::SixMonths => trailing_days(series, max_date, 182),
        PeriodToken::OneYear => trailing_days(series, max_date, 365),
        PeriodToken::FiveYears => trailing_days(series, max_date, 1825),
    }
}

fn trailing_days(series: &Series, max_date: NaiveDate, days: i64) -> Series {
    let cutoff = max_date - Duration::days(days);
    let bars = series
        .bars
        .iter()
        .filter(|b| b.date >= cutoff)
        .cloned()
        .collect();
    Series::new(series.symbol.clone(), bars)
}
