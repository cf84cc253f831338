use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate};
use error_stack::{Report, ResultExt, bail};
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::source::{MarketData, RawBar};

/// Market data source reading a local OHLCV CSV file.
///
/// Expects a header row containing (case-insensitively) `Date`, `Open`,
/// `High`, `Low`, `Close`, `Volume`, in any column order. Dates may be
/// plain `YYYY-MM-DD` or RFC 3339 timestamps with an offset.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn read_rows(&self, symbol: &str) -> Result<Vec<RawBar>, Report<SourceError>> {
        let mut reader = csv::ReaderBuilder::new()
            .from_path(&self.path)
            .change_context(SourceError::DataUnavailable {
                symbol: symbol.to_owned(),
            })
            .attach_with(|| format!("path: {}", self.path.display()))?;

        let headers: Vec<String> = reader
            .headers()
            .change_context(SourceError::DataUnavailable {
                symbol: symbol.to_owned(),
            })?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        let col = |name: &str| headers.iter().position(|h| h == name);
        let (Some(date_col), Some(open_col), Some(high_col), Some(low_col), Some(close_col)) = (
            col("date"),
            col("open"),
            col("high"),
            col("low"),
            col("close"),
        ) else {
            bail!(
                Report::new(SourceError::DataUnavailable {
                    symbol: symbol.to_owned(),
                })
                .attach("missing one of Date/Open/High/Low/Close headers")
            );
        };
        let volume_col = col("volume");

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.change_context(SourceError::DataUnavailable {
                symbol: symbol.to_owned(),
            })?;

            let Some(timestamp) = record.get(date_col).and_then(parse_date) else {
                warn!(path = %self.path.display(), line, "skipping row with unparseable date");
                continue;
            };

            let price = |idx: usize| record.get(idx).and_then(|v| v.trim().parse::<f64>().ok());
            rows.push(RawBar {
                timestamp,
                open: price(open_col),
                high: price(high_col),
                low: price(low_col),
                close: price(close_col),
                volume: volume_col
                    .and_then(|idx| record.get(idx))
                    // Volume columns sometimes come as "1234.0"
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .map(|v| v.max(0.0) as u64),
            });
        }

        debug!(path = %self.path.display(), rows = rows.len(), "csv read complete");
        Ok(rows)
    }
}

fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    // Space-separated offset form ("2019-01-02 00:00:00-05:00")
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(midnight.and_utc().fixed_offset())
}

impl MarketData for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BoxFuture<'_, Result<Vec<RawBar>, Report<SourceError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let rows = self.read_rows(&symbol)?;
            Ok(rows
                .into_iter()
                .filter(|r| {
                    let date = r.timestamp.date_naive();
                    start <= date && date <= end
                })
                .collect())
        })
    }

    fn fetch_full_history(
        &self,
        symbol: &str,
    ) -> BoxFuture<'_, Result<Vec<RawBar>, Report<SourceError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move { self.read_rows(&symbol) })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("stocklens-test-{name}.csv"));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn reads_plain_date_csv() {
        let path = write_temp(
            "plain",
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-02,10,12,9,11,1000\n\
             2024-01-03,11,13,10,12,1100\n",
        );
        let source = CsvSource::new(&path);
        let rows = source.fetch_full_history("TEST").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp.date_naive(), d(2024, 1, 2));
        assert_eq!(rows[0].close, Some(11.0));
        assert_eq!(rows[1].volume, Some(1100));
    }

    #[tokio::test]
    async fn fetch_filters_by_inclusive_range() {
        let path = write_temp(
            "range",
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-02,10,12,9,11,1000\n\
             2024-01-03,11,13,10,12,1100\n\
             2024-01-04,12,14,11,13,1200\n",
        );
        let source = CsvSource::new(&path);
        let rows = source
            .fetch("TEST", d(2024, 1, 3), d(2024, 1, 4))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp.date_naive(), d(2024, 1, 3));
    }

    #[tokio::test]
    async fn offset_dates_keep_their_calendar_day() {
        let path = write_temp(
            "offset",
            "Date,Open,High,Low,Close,Volume\n\
             2019-01-02 00:00:00-05:00,10,12,9,11,1000\n",
        );
        let source = CsvSource::new(&path);
        let rows = source.fetch_full_history("TEST").await.unwrap();
        assert_eq!(rows[0].timestamp.date_naive(), d(2019, 1, 2));
    }

    #[tokio::test]
    async fn unparseable_date_row_skipped() {
        let path = write_temp(
            "baddate",
            "Date,Open,High,Low,Close,Volume\n\
             not-a-date,10,12,9,11,1000\n\
             2024-01-03,11,13,10,12,1100\n",
        );
        let source = CsvSource::new(&path);
        let rows = source.fetch_full_history("TEST").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_data_unavailable() {
        let source = CsvSource::new("/nonexistent/stocklens.csv");
        let report = source.fetch_full_history("TEST").await.unwrap_err();
        assert!(matches!(
            report.current_context(),
            SourceError::DataUnavailable { .. }
        ));
    }

    #[tokio::test]
    async fn missing_required_header_rejected() {
        let path = write_temp("noheader", "Date,Open,High,Low\n2024-01-02,10,12,9\n");
        let source = CsvSource::new(&path);
        assert!(source.fetch_full_history("TEST").await.is_err());
    }

    #[tokio::test]
    async fn float_volume_truncates() {
        let path = write_temp(
            "floatvol",
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-02,10,12,9,11,1234.0\n",
        );
        let source = CsvSource::new(&path);
        let rows = source.fetch_full_history("TEST").await.unwrap();
        assert_eq!(rows[0].volume, Some(1234));
    }
}
