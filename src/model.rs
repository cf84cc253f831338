use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One trading day of OHLCV data.
///
/// Invariant (enforced by the loader): `low <= min(open, close)` and
/// `max(open, close) <= high`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Whether the OHLC fields satisfy the ordering invariant.
    pub fn is_ordered(&self) -> bool {
        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        self.low <= body_low && body_high <= self.high
    }
}

/// An ordered OHLCV series for one ticker symbol.
///
/// Bars are sorted strictly ascending by date with unique dates.
/// A `Series` is never mutated in place; windowing and indicator
/// computations produce new collections.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub symbol: String,
    pub bars: Vec<Bar>,
}

impl Series {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[allow(dead_code)]
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Close prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// The date axis in ascending order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    /// The last `n` bars, newest first (the recent-history table of the
    /// analysis view).
    pub fn recent(&self, n: usize) -> Vec<Bar> {
        self.bars.iter().rev().take(n).cloned().collect()
    }
}

/// Named relative window, resolved against a series' own latest date.
///
/// String representations match the config file format (e.g. `"5d"`,
/// `"1y"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodToken {
    FiveDays,
    OneMonth,
    SixMonths,
    YearToDate,
    OneYear,
    FiveYears,
    Max,
}

impl PeriodToken {
    /// Parse a config-format string into a `PeriodToken`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "5d" => Some(Self::FiveDays),
            "1mo" => Some(Self::OneMonth),
            "6mo" => Some(Self::SixMonths),
            "ytd" => Some(Self::YearToDate),
            "1y" => Some(Self::OneYear),
            "5y" => Some(Self::FiveYears),
            "max" => Some(Self::Max),
            _ => None,
        }
    }

    /// Return the config-format string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FiveDays => "5d",
            Self::OneMonth => "1mo",
            Self::SixMonths => "6mo",
            Self::YearToDate => "ytd",
            Self::OneYear => "1y",
            Self::FiveYears => "5y",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for PeriodToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A window over a series: either a named relative period or an explicit
/// inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Period(PeriodToken),
    Range { start: NaiveDate, end: NaiveDate },
}

/// Last close vs. previous close (the daily-change metric).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub last_close: f64,
    pub prev_close: f64,
    pub change: f64,
}

impl Summary {
    /// `None` when the series has fewer than two bars.
    pub fn from_series(series: &Series) -> Option<Self> {
        let n = series.len();
        if n < 2 {
            return None;
        }
        let last_close = series.bars[n - 1].close;
        let prev_close = series.bars[n - 2].close;
        Some(Self {
            last_close,
            prev_close,
            change: last_close - prev_close,
        })
    }
}

/// January 1 of `date`'s year. Used to resolve the `ytd` token.
pub fn year_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: NaiveDate, close: f64) -> Bar {
        Bar {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 100,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn period_token_round_trip() {
        let tokens = [
            ("5d", PeriodToken::FiveDays),
            ("1mo", PeriodToken::OneMonth),
            ("6mo", PeriodToken::SixMonths),
            ("ytd", PeriodToken::YearToDate),
            ("1y", PeriodToken::OneYear),
            ("5y", PeriodToken::FiveYears),
            ("max", PeriodToken::Max),
        ];
        for (s, token) in tokens {
            assert_eq!(PeriodToken::from_str(s), Some(token));
            assert_eq!(token.as_str(), s);
        }
    }

    #[test]
    fn period_token_invalid_string_returns_none() {
        assert_eq!(PeriodToken::from_str("2mo"), None);
        assert_eq!(PeriodToken::from_str(""), None);
    }

    #[test]
    fn bar_ordering_invariant() {
        let ok = Bar {
            date: d(2024, 1, 2),
            open: 10.0,
            high: 12.0,
            low: 9.0,
            close: 11.0,
            volume: 1,
        };
        assert!(ok.is_ordered());

        let bad_high = Bar {
            high: 10.5,
            ..ok.clone()
        };
        assert!(!bad_high.is_ordered());

        let bad_low = Bar {
            low: 10.5,
            ..ok.clone()
        };
        assert!(!bad_low.is_ordered());
    }

    #[test]
    fn series_accessors() {
        let series = Series::new(
            "TEST",
            vec![bar(d(2024, 1, 2), 10.0), bar(d(2024, 1, 3), 11.0)],
        );
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), Some(d(2024, 1, 2)));
        assert_eq!(series.last_date(), Some(d(2024, 1, 3)));
        assert_eq!(series.closes(), vec![10.0, 11.0]);
        assert_eq!(series.dates(), vec![d(2024, 1, 2), d(2024, 1, 3)]);
    }

    #[test]
    fn recent_returns_newest_first() {
        let series = Series::new(
            "TEST",
            vec![
                bar(d(2024, 1, 2), 10.0),
                bar(d(2024, 1, 3), 11.0),
                bar(d(2024, 1, 4), 12.0),
            ],
        );
        let recent = series.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].date, d(2024, 1, 4));
        assert_eq!(recent[1].date, d(2024, 1, 3));
    }

    #[test]
    fn summary_needs_two_bars() {
        let one = Series::new("TEST", vec![bar(d(2024, 1, 2), 10.0)]);
        assert!(Summary::from_series(&one).is_none());

        let two = Series::new(
            "TEST",
            vec![bar(d(2024, 1, 2), 10.0), bar(d(2024, 1, 3), 12.5)],
        );
        let summary = Summary::from_series(&two).unwrap();
        assert_eq!(summary.last_close, 12.5);
        assert_eq!(summary.prev_close, 10.0);
        assert!((summary.change - 2.5).abs() < 1e-12);
    }

    #[test]
    fn year_start_of_any_date() {
        assert_eq!(year_start(d(2024, 6, 15)), d(2024, 1, 1));
        assert_eq!(year_start(d(2024, 1, 1)), d(2024, 1, 1));
    }
}
