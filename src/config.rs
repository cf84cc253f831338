use std::path::Path;

use chrono::NaiveDate;
use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::chart::ChartKind;
use crate::error::ConfigError;
use crate::model::{PeriodToken, Window};

const DATE_FORMAT: &str = "%Y-%m-%d";
const VALID_INDICATORS: &[&str] = &["close", "sma", "ema", "rsi", "macd"];

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_provider() -> String {
    "yahoo".into()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_kind() -> String {
    "candle".into()
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub charts: Vec<ChartConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Required when `provider = "csv"`.
    pub csv_path: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            csv_path: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// A `[source]` section resolved into a concrete provider choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    Yahoo { timeout_secs: u64 },
    Csv { path: String },
}

impl SourceConfig {
    /// Resolve the provider name and its required fields in one step, so
    /// callers never see a csv provider without a path.
    pub fn provider_kind(&self) -> Result<Provider, Report<ConfigError>> {
        match self.provider.as_str() {
            "yahoo" => Ok(Provider::Yahoo {
                timeout_secs: self.timeout_secs,
            }),
            "csv" => match &self.csv_path {
                Some(path) => Ok(Provider::Csv { path: path.clone() }),
                None => Err(Report::new(ConfigError::Validation {
                    field: "source.csv_path is required for the csv provider".into(),
                })),
            },
            other => Err(Report::new(ConfigError::Validation {
                field: format!("source.provider \"{other}\" is not valid"),
            })),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChartConfig {
    pub symbol: String,
    /// Accepted values: `"candle"` | `"candlestick"` | `"line"` | `"bar"`
    #[serde(default = "default_kind")]
    pub kind: String,
    /// A period token (`"5d"`, `"1mo"`, ... `"max"`). Mutually exclusive
    /// with `start`/`end`. Defaults to `"1y"` when neither is given.
    pub period: Option<String>,
    /// Explicit range bounds, format `YYYY-MM-DD`. Both or neither.
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(default)]
    pub indicators: Vec<String>,
    #[serde(default)]
    pub params: IndicatorParams,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct IndicatorParams {
    pub window: Option<usize>,
    pub fast: Option<usize>,
    pub slow: Option<usize>,
    pub signal: Option<usize>,
}

impl ChartConfig {
    pub fn chart_kind(&self) -> ChartKind {
        ChartKind::from_str(&self.kind).unwrap_or(ChartKind::Candlestick)
    }

    /// The window this chart asks for. Assumes a validated config; falls
    /// back to the dashboard default of one year.
    pub fn window(&self) -> Window {
        if let Some(token) = self.period.as_deref().and_then(PeriodToken::from_str) {
            return Window::Period(token);
        }
        if let (Some(start), Some(end)) = (parse_date(&self.start), parse_date(&self.end)) {
            return Window::Range { start, end };
        }
        Window::Period(PeriodToken::OneYear)
    }
}

fn parse_date(value: &Option<String>) -> Option<NaiveDate> {
    value
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    config.source.provider_kind()?;
    for chart in &config.charts {
        validate_chart(chart)?;
    }
    Ok(())
}

fn validate_chart(chart: &ChartConfig) -> Result<(), Report<ConfigError>> {
    let symbol = chart.symbol.as_str();
    if symbol.trim().is_empty() {
        return Err(Report::new(ConfigError::Validation {
            field: "charts[].symbol must not be empty".into(),
        }));
    }

    if ChartKind::from_str(&chart.kind).is_none() {
        return Err(Report::new(ConfigError::Validation {
            field: format!("charts[{symbol}].kind \"{}\" is not valid", chart.kind),
        }));
    }

    validate_window(chart)?;

    for name in &chart.indicators {
        if !VALID_INDICATORS.contains(&name.as_str()) {
            return Err(Report::new(ConfigError::Validation {
                field: format!("charts[{symbol}].indicators: unknown indicator \"{name}\""),
            }));
        }
    }

    validate_params(symbol, &chart.params)
}

fn validate_window(chart: &ChartConfig) -> Result<(), Report<ConfigError>> {
    let symbol = chart.symbol.as_str();

    if let Some(period) = &chart.period {
        if PeriodToken::from_str(period).is_none() {
            return Err(Report::new(ConfigError::Validation {
                field: format!("charts[{symbol}].period \"{period}\" is not a known token"),
            }));
        }
        if chart.start.is_some() || chart.end.is_some() {
            return Err(Report::new(ConfigError::Validation {
                field: format!("charts[{symbol}]: period and start/end are mutually exclusive"),
            }));
        }
        return Ok(());
    }

    match (&chart.start, &chart.end) {
        (None, None) => Ok(()),
        (Some(_), Some(_)) => {
            let (Some(start), Some(end)) = (parse_date(&chart.start), parse_date(&chart.end))
            else {
                return Err(Report::new(ConfigError::Validation {
                    field: format!("charts[{symbol}]: start/end must be YYYY-MM-DD dates"),
                }));
            };
            if start > end {
                return Err(Report::new(ConfigError::Validation {
                    field: format!("charts[{symbol}]: start {start} is after end {end}"),
                }));
            }
            Ok(())
        }
        _ => Err(Report::new(ConfigError::Validation {
            field: format!("charts[{symbol}]: start and end must be given together"),
        })),
    }
}

fn validate_params(symbol: &str, params: &IndicatorParams) -> Result<(), Report<ConfigError>> {
    for (name, value) in [
        ("window", params.window),
        ("fast", params.fast),
        ("slow", params.slow),
        ("signal", params.signal),
    ] {
        if value == Some(0) {
            return Err(Report::new(ConfigError::Validation {
                field: format!("charts[{symbol}].params.{name} must be > 0"),
            }));
        }
    }

    if let (Some(fast), Some(slow)) = (params.fast, params.slow)
        && fast >= slow
    {
        return Err(Report::new(ConfigError::Validation {
            field: format!("charts[{symbol}].params: fast must be < slow"),
        }));
    }

    Ok(())
}
