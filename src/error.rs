use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Display, Error)]
pub enum SourceError {
    #[display("unrecognized symbol: {symbol}")]
    InvalidSymbol { symbol: String },
    #[display("no data available for {symbol}")]
    DataUnavailable { symbol: String },
}

#[derive(Debug, Display, Error)]
pub enum WindowError {
    #[display("invalid range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },
}

#[derive(Debug, Display, Error)]
pub enum IndicatorError {
    #[display("insufficient data: need {required}, got {available}")]
    InsufficientData { required: usize, available: usize },
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
}

#[derive(Debug, Display, Error)]
pub enum ChartError {
    #[display("series \"{name}\" does not align with the chart's date axis")]
    IncompatibleSeries { name: String },
}
