use error_stack::{Report, bail};
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::model::{Bar, Series};
use crate::source::RawBar;

/// Normalize raw source rows into a canonical [`Series`].
///
/// This is the single place where upstream shape inconsistencies are
/// resolved: every downstream component sees bars sorted strictly
/// ascending by date, with unique dates and valid OHLC ordering.
///
/// - Timestamps truncate to the calendar date in the source's own offset
///   (no zone shifting).
/// - Rows with any missing OHLC field are skipped; a missing volume
///   defaults to 0.
/// - Duplicate dates collapse, keeping the last row the source sent.
/// - Bars that violate `low <= min(open, close) <= max(open, close) <= high`
///   are skipped with a warning.
/// - No usable rows at all is `DataUnavailable`.
pub fn normalize(symbol: &str, rows: Vec<RawBar>) -> Result<Series, Report<SourceError>> {
    if rows.is_empty() {
        bail!(SourceError::DataUnavailable {
            symbol: symbol.to_owned(),
        });
    }

    let total = rows.len();
    let mut bars: Vec<Bar> = Vec::with_capacity(total);

    for row in rows {
        let (Some(open), Some(high), Some(low), Some(close)) =
            (row.open, row.high, row.low, row.close)
        else {
            debug!(symbol, timestamp = %row.timestamp, "skipping row with missing OHLC");
            continue;
        };

        let bar = Bar {
            date: row.timestamp.date_naive(),
            open,
            high,
            low,
            close,
            volume: row.volume.unwrap_or(0),
        };

        if !bar.is_ordered() {
            warn!(symbol, date = %bar.date, "skipping bar violating OHLC ordering");
            continue;
        }

        bars.push(bar);
    }

    bars.sort_by_key(|b| b.date);
    // Keep the last row the source sent for a given date
    bars.reverse();
    bars.dedup_by_key(|b| b.date);
    bars.reverse();

    if bars.is_empty() {
        bail!(SourceError::DataUnavailable {
            symbol: symbol.to_owned(),
        });
    }

    debug!(symbol, rows = total, bars = bars.len(), "normalized series");

    Ok(Series::new(symbol, bars))
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, TimeZone};

    use super::*;

    fn raw(y: i32, m: u32, d: u32, close: f64) -> RawBar {
        let tz = FixedOffset::east_opt(0).unwrap();
        RawBar {
            timestamp: tz.with_ymd_and_hms(y, m, d, 16, 0, 0).unwrap(),
            open: Some(close),
            high: Some(close),
            low: Some(close),
            close: Some(close),
            volume: Some(1_000),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn empty_input_is_data_unavailable() {
        let result = normalize("TEST", vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn rows_sorted_ascending() {
        let rows = vec![raw(2024, 1, 4, 3.0), raw(2024, 1, 2, 1.0), raw(2024, 1, 3, 2.0)];
        let series = normalize("TEST", rows).unwrap();
        assert_eq!(
            series.dates(),
            vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4)]
        );
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn duplicate_dates_keep_last_row() {
        let rows = vec![raw(2024, 1, 2, 1.0), raw(2024, 1, 2, 9.0)];
        let series = normalize("TEST", rows).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.bars[0].close, 9.0);
    }

    #[test]
    fn missing_ohlc_rows_skipped() {
        let mut gap = raw(2024, 1, 3, 2.0);
        gap.close = None;
        let rows = vec![raw(2024, 1, 2, 1.0), gap, raw(2024, 1, 4, 3.0)];
        let series = normalize("TEST", rows).unwrap();
        assert_eq!(series.dates(), vec![d(2024, 1, 2), d(2024, 1, 4)]);
    }

    #[test]
    fn missing_volume_defaults_to_zero() {
        let mut row = raw(2024, 1, 2, 1.0);
        row.volume = None;
        let series = normalize("TEST", vec![row]).unwrap();
        assert_eq!(series.bars[0].volume, 0);
    }

    #[test]
    fn unordered_ohlc_bar_skipped() {
        let mut bad = raw(2024, 1, 3, 10.0);
        bad.high = Some(5.0); // high below close
        let rows = vec![raw(2024, 1, 2, 1.0), bad];
        let series = normalize("TEST", rows).unwrap();
        assert_eq!(series.dates(), vec![d(2024, 1, 2)]);
    }

    #[test]
    fn all_rows_unusable_is_data_unavailable() {
        let mut bad = raw(2024, 1, 2, 1.0);
        bad.open = None;
        assert!(normalize("TEST", vec![bad]).is_err());
    }

    #[test]
    fn timestamp_truncates_in_source_offset() {
        // 23:00 at UTC-5 stays on its own calendar date; a UTC shift would
        // have landed it on the next day.
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let row = RawBar {
            timestamp: tz.with_ymd_and_hms(2024, 1, 2, 23, 0, 0).unwrap(),
            open: Some(1.0),
            high: Some(1.0),
            low: Some(1.0),
            close: Some(1.0),
            volume: Some(1),
        };
        let series = normalize("TEST", vec![row]).unwrap();
        assert_eq!(series.bars[0].date, d(2024, 1, 2));
    }
}
