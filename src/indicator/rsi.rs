use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, IndicatorOutput};
use crate::model::Series;

/// RSI (Relative Strength Index) using simple rolling averages of gains
/// and losses (Cutler's convention, not Wilder smoothing).
///
/// Each value is `100 - 100 / (1 + RS)` where `RS` is the mean gain
/// divided by the mean loss over the trailing `window` close-to-close
/// deltas. A window with zero mean loss is defined as exactly 100.
pub struct Rsi {
    window: usize,
}

pub const DEFAULT_RSI_WINDOW: usize = 14;

impl Rsi {
    pub fn new(window: usize) -> Result<Self, Report<IndicatorError>> {
        if window == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "window must be > 0".into(),
            });
        }
        Ok(Self { window })
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "rsi"
    }

    fn required_bars(&self) -> usize {
        // `window` deltas need `window + 1` closes
        self.window + 1
    }

    fn compute(&self, series: &Series) -> Result<IndicatorOutput, Report<IndicatorError>> {
        let prices = series.closes();
        if prices.len() < self.required_bars() {
            bail!(IndicatorError::InsufficientData {
                required: self.required_bars(),
                available: prices.len(),
            });
        }

        let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

        let values: Vec<f64> = deltas
            .windows(self.window)
            .map(|w| {
                let avg_gain = w.iter().map(|&d| d.max(0.0)).sum::<f64>() / self.window as f64;
                let avg_loss = w.iter().map(|&d| (-d).max(0.0)).sum::<f64>() / self.window as f64;
                rsi_value(avg_gain, avg_loss)
            })
            .collect();

        Ok(IndicatorOutput::from_suffix(self.name(), series, values))
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use crate::indicator::test_support::series_from_closes;

    use super::*;

    #[test]
    fn rsi_window_zero_invalid() {
        assert!(Rsi::new(0).is_err());
    }

    #[test]
    fn rsi_insufficient_data() {
        let rsi = Rsi::new(14).unwrap();
        assert!(rsi.compute(&series_from_closes(&[1.0; 14])).is_err());
    }

    #[test]
    fn rsi_output_length_is_n_minus_window() {
        let rsi = Rsi::new(14).unwrap();
        let series = series_from_closes(&[100.0; 30]);
        let out = rsi.compute(&series).unwrap();
        assert_eq!(out.len(), 16);
    }

    #[test]
    fn rsi_constant_series_is_exactly_100() {
        // No bar ever loses, so avg_loss is zero at every position
        let rsi = Rsi::new(14).unwrap();
        let series = series_from_closes(&[100.0; 30]);
        let out = rsi.compute(&series).unwrap();
        for v in &out.values {
            assert_eq!(*v, 100.0);
        }
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let rsi = Rsi::new(3).unwrap();
        let series = series_from_closes(&[1.0, 2.0, 3.0, 4.0]);
        let out = rsi.compute(&series).unwrap();
        assert_eq!(out.values, vec![100.0]);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let rsi = Rsi::new(3).unwrap();
        let series = series_from_closes(&[4.0, 3.0, 2.0, 1.0]);
        let out = rsi.compute(&series).unwrap();
        assert!(out.values[0].abs() < 1e-12);
    }

    #[test]
    fn rsi_always_within_bounds() {
        let rsi = Rsi::new(3).unwrap();
        let closes = [10.0, 12.0, 9.0, 14.0, 8.0, 11.0, 13.0, 7.0, 15.0];
        let out = rsi.compute(&series_from_closes(&closes)).unwrap();
        for v in &out.values {
            assert!((0.0..=100.0).contains(v), "RSI out of bounds: {v}");
        }
    }

    #[test]
    fn rsi_balanced_gains_and_losses_is_50() {
        // Alternating +1/-1 over an even window: mean gain == mean loss
        let rsi = Rsi::new(2).unwrap();
        let series = series_from_closes(&[10.0, 11.0, 10.0, 11.0]);
        let out = rsi.compute(&series).unwrap();
        for v in &out.values {
            assert!((v - 50.0).abs() < 1e-12);
        }
    }

    #[test]
    fn rsi_dates_align_with_suffix() {
        let rsi = Rsi::new(3).unwrap();
        let series = series_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let out = rsi.compute(&series).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.dates, series.dates()[3..].to_vec());
    }
}
