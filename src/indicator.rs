pub mod ma;
pub mod macd;
pub mod rsi;

use chrono::NaiveDate;
use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::model::Series;

/// A named derived series aligned index-for-index with a suffix of its
/// source series.
///
/// Leading positions where the rolling window is not yet full are absent,
/// never zero-filled: `dates` holds only the dates that have values.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorOutput {
    pub name: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl IndicatorOutput {
    /// Align `values` with the trailing dates of `series`.
    ///
    /// Callers guarantee `values.len() <= series.len()`.
    pub fn from_suffix(name: impl Into<String>, series: &Series, values: Vec<f64>) -> Self {
        let skip = series.len() - values.len();
        let dates = series.bars[skip..].iter().map(|b| b.date).collect();
        Self {
            name: name.into(),
            dates,
            values,
        }
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A technical analysis indicator over an OHLCV series.
///
/// Bars must be in ascending chronological order (oldest first). Every
/// implementation is a pure function of its input: rejected inputs never
/// produce partial output.
pub trait Indicator: Send {
    /// Unique name of this indicator (e.g., "rsi", "sma").
    fn name(&self) -> &str;

    /// Minimum number of bars required to produce at least one value.
    fn required_bars(&self) -> usize;

    /// Compute the indicator, aligned to a suffix of `series`.
    fn compute(&self, series: &Series) -> Result<IndicatorOutput, Report<IndicatorError>>;
}

/// The close price itself, as an overlay series (window of 1).
pub struct CloseOverlay;

impl Indicator for CloseOverlay {
    fn name(&self) -> &str {
        "close"
    }

    fn required_bars(&self) -> usize {
        1
    }

    fn compute(&self, series: &Series) -> Result<IndicatorOutput, Report<IndicatorError>> {
        if series.is_empty() {
            bail!(IndicatorError::InsufficientData {
                required: 1,
                available: 0,
            });
        }
        Ok(IndicatorOutput::from_suffix(
            self.name(),
            series,
            series.closes(),
        ))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::series_from_closes;
    use super::*;

    #[test]
    fn close_overlay_mirrors_closes() {
        let series = series_from_closes(&[1.0, 2.0, 3.0]);
        let out = CloseOverlay.compute(&series).unwrap();
        assert_eq!(out.values, vec![1.0, 2.0, 3.0]);
        assert_eq!(out.dates, series.dates());
        assert_eq!(out.name, "close");
    }

    #[test]
    fn close_overlay_rejects_empty_series() {
        let series = series_from_closes(&[]);
        assert!(CloseOverlay.compute(&series).is_err());
    }

    #[test]
    fn from_suffix_aligns_trailing_dates() {
        let series = series_from_closes(&[1.0, 2.0, 3.0, 4.0]);
        let out = IndicatorOutput::from_suffix("x", &series, vec![9.0, 9.5]);
        assert_eq!(out.dates, series.dates()[2..].to_vec());
        assert_eq!(out.len(), 2);
    }
}
