use chrono::NaiveDate;
use error_stack::{Report, bail};
use serde::Serialize;

use crate::error::ChartError;
use crate::indicator::IndicatorOutput;
use crate::indicator::macd::MacdLines;
use crate::model::{Bar, Series, Summary};

/// Rows shown in the recent-history table of a chart spec.
const RECENT_BARS: usize = 10;

/// RSI guide levels drawn on its sub-panel.
const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Candlestick,
    Line,
    Bar,
}

impl ChartKind {
    /// Parse a config-format string into a `ChartKind`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "candle" | "candlestick" => Some(Self::Candlestick),
            "line" => Some(Self::Line),
            "bar" => Some(Self::Bar),
            _ => None,
        }
    }
}

/// One named line drawn against a date axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineTrace {
    pub name: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl From<IndicatorOutput> for LineTrace {
    fn from(out: IndicatorOutput) -> Self {
        Self {
            name: out.name,
            dates: out.dates,
            values: out.values,
        }
    }
}

/// The base data of a chart, shaped per chart kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaseChart {
    Candlestick {
        dates: Vec<NaiveDate>,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
    },
    Line {
        dates: Vec<NaiveDate>,
        close: Vec<f64>,
    },
    Bar {
        dates: Vec<NaiveDate>,
        volume: Vec<u64>,
    },
}

/// An indicator drawn below the price panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubPanel {
    pub name: String,
    pub traces: Vec<LineTrace>,
    /// Horizontal guide levels (e.g. RSI 30/70).
    pub levels: Vec<f64>,
    pub histogram: Option<LineTrace>,
}

impl SubPanel {
    pub fn rsi(out: IndicatorOutput) -> Self {
        Self {
            name: "rsi".into(),
            traces: vec![out.into()],
            levels: vec![RSI_OVERSOLD, RSI_OVERBOUGHT],
            histogram: None,
        }
    }

    pub fn macd(lines: MacdLines) -> Self {
        let MacdLines {
            dates,
            macd,
            signal,
            histogram,
        } = lines;
        Self {
            name: "macd".into(),
            traces: vec![
                LineTrace {
                    name: "macd".into(),
                    dates: dates.clone(),
                    values: macd,
                },
                LineTrace {
                    name: "signal".into(),
                    dates: dates.clone(),
                    values: signal,
                },
            ],
            levels: Vec::new(),
            histogram: Some(LineTrace {
                name: "histogram".into(),
                dates,
                values: histogram,
            }),
        }
    }
}

/// A renderer-agnostic chart description: base chart, overlay traces on
/// the price panel, indicator sub-panels, plus the summary metric and
/// recent-history rows of the analysis view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub symbol: String,
    pub base: BaseChart,
    pub overlays: Vec<LineTrace>,
    pub panels: Vec<SubPanel>,
    pub summary: Option<Summary>,
    pub recent: Vec<Bar>,
}

/// Shape indicator outputs and OHLC columns into a [`ChartSpec`].
///
/// Every overlay and panel trace must align with a suffix of the base
/// chart's date axis; anything else is `IncompatibleSeries`. No other
/// business logic lives here.
pub fn assemble(
    series: &Series,
    kind: ChartKind,
    overlays: Vec<IndicatorOutput>,
    panels: Vec<SubPanel>,
) -> Result<ChartSpec, Report<ChartError>> {
    let axis = series.dates();

    for overlay in &overlays {
        check_alignment(&axis, &overlay.name, &overlay.dates)?;
    }
    for panel in &panels {
        for trace in &panel.traces {
            check_alignment(&axis, &trace.name, &trace.dates)?;
        }
        if let Some(histogram) = &panel.histogram {
            check_alignment(&axis, &histogram.name, &histogram.dates)?;
        }
    }

    let base = match kind {
        ChartKind::Candlestick => BaseChart::Candlestick {
            dates: axis,
            open: series.bars.iter().map(|b| b.open).collect(),
            high: series.bars.iter().map(|b| b.high).collect(),
            low: series.bars.iter().map(|b| b.low).collect(),
            close: series.closes(),
        },
        ChartKind::Line => BaseChart::Line {
            dates: axis,
            close: series.closes(),
        },
        ChartKind::Bar => BaseChart::Bar {
            dates: axis,
            volume: series.bars.iter().map(|b| b.volume).collect(),
        },
    };

    Ok(ChartSpec {
        symbol: series.symbol.clone(),
        base,
        overlays: overlays.into_iter().map(LineTrace::from).collect(),
        panels,
        summary: Summary::from_series(series),
        recent: series.recent(RECENT_BARS),
    })
}

fn check_alignment(
    axis: &[NaiveDate],
    name: &str,
    dates: &[NaiveDate],
) -> Result<(), Report<ChartError>> {
    if dates.len() > axis.len() || axis[axis.len() - dates.len()..] != *dates {
        bail!(ChartError::IncompatibleSeries {
            name: name.to_owned(),
        });
    }
    Ok(())
}
