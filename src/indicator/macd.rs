use chrono::NaiveDate;
use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::ma::Ema;
use crate::indicator::{Indicator, IndicatorOutput};
use crate::model::Series;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

/// MACD: fast EMA minus slow EMA of close, with a signal line that is the
/// EMA of that difference.
///
/// Both EMAs are seeded with the first sample, so all three lines cover
/// the full series length once the `slow`-bar minimum is met.
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
}

/// The three MACD traces, sharing one date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdLines {
    pub dates: Vec<NaiveDate>,
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, Report<IndicatorError>> {
        if fast == 0 || slow == 0 || signal == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "all periods must be > 0".into(),
            });
        }
        if fast >= slow {
            bail!(IndicatorError::InvalidParameter {
                name: "fast must be < slow".into(),
            });
        }
        Ok(Self { fast, slow, signal })
    }

    /// Calculate the macd, signal, and histogram lines.
    pub fn compute_full(&self, series: &Series) -> Result<MacdLines, Report<IndicatorError>> {
        let prices = series.closes();
        if prices.len() < self.required_bars() {
            bail!(IndicatorError::InsufficientData {
                required: self.required_bars(),
                available: prices.len(),
            });
        }

        let fast_ema = Ema::new(self.fast)?.smooth(&prices);
        let slow_ema = Ema::new(self.slow)?.smooth(&prices);

        let macd: Vec<f64> = fast_ema
            .iter()
            .zip(slow_ema.iter())
            .map(|(f, s)| f - s)
            .collect();

        let signal = Ema::new(self.signal)?.smooth(&macd);

        let histogram: Vec<f64> = macd
            .iter()
            .zip(signal.iter())
            .map(|(m, s)| m - s)
            .collect();

        Ok(MacdLines {
            dates: series.dates(),
            macd,
            signal,
            histogram,
        })
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST,
            slow: DEFAULT_SLOW,
            signal: DEFAULT_SIGNAL,
        }
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        "macd"
    }

    fn required_bars(&self) -> usize {
        self.slow
    }

    /// Returns the MACD line only.
    fn compute(&self, series: &Series) -> Result<IndicatorOutput, Report<IndicatorError>> {
        let lines = self.compute_full(series)?;
        Ok(IndicatorOutput::from_suffix(self.name(), series, lines.macd))
    }
}
