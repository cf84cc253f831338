use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, IndicatorOutput};
use crate::model::Series;

/// Default moving-average length of the analysis view.
pub const DEFAULT_MA_WINDOW: usize = 50;

/// Simple Moving Average of close prices.
///
/// For a series of length `n` the output has exactly `n - window + 1`
/// values; the first `window - 1` positions are absent (window not full).
pub struct Sma {
    window: usize,
}

impl Sma {
    pub fn new(window: usize) -> Result<Self, Report<IndicatorError>> {
        if window == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "window must be > 0".into(),
            });
        }
        Ok(Self { window })
    }

    /// Rolling means over a raw price slice (internal helper).
    pub fn rolling_means(&self, prices: &[f64]) -> Result<Vec<f64>, Report<IndicatorError>> {
        if prices.len() < self.window {
            bail!(IndicatorError::InsufficientData {
                required: self.window,
                available: prices.len(),
            });
        }
        Ok(prices
            .windows(self.window)
            .map(|w| w.iter().sum::<f64>() / self.window as f64)
            .collect())
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        "sma"
    }

    fn required_bars(&self) -> usize {
        self.window
    }

    fn compute(&self, series: &Series) -> Result<IndicatorOutput, Report<IndicatorError>> {
        let values = self.rolling_means(&series.closes())?;
        Ok(IndicatorOutput::from_suffix(self.name(), series, values))
    }
}

/// Exponential Moving Average of close prices.
///
/// The recurrence is seeded with the first sample: `ema[0] = x[0]`,
/// `ema[i] = x[i] * a + ema[i-1] * (1 - a)` with `a = 2 / (period + 1)`,
/// so the output covers the full input length.
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self { period })
    }

    /// Apply the EMA recurrence to an arbitrary value slice.
    ///
    /// Defined for any input length; an empty slice yields an empty
    /// output. Length checks belong to the callers that need them.
    pub fn smooth(&self, values: &[f64]) -> Vec<f64> {
        let alpha = 2.0 / (self.period as f64 + 1.0);
        let mut out = Vec::with_capacity(values.len());
        let mut ema = match values.first() {
            Some(&first) => first,
            None => return out,
        };
        out.push(ema);
        for &value in &values[1..] {
            ema = value * alpha + ema * (1.0 - alpha);
            out.push(ema);
        }
        out
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        "ema"
    }

    fn required_bars(&self) -> usize {
        self.period
    }

    fn compute(&self, series: &Series) -> Result<IndicatorOutput, Report<IndicatorError>> {
        if series.len() < self.period {
            bail!(IndicatorError::InsufficientData {
                required: self.period,
                available: series.len(),
            });
        }
        let values = self.smooth(&series.closes());
        Ok(IndicatorOutput::from_suffix(self.name(), series, values))
    }
}
