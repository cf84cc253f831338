mod chart;
mod config;
mod error;
mod indicator;
mod loader;
mod model;
mod source;
mod window;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chart::{ChartSpec, SubPanel};
use config::{AppConfig, ChartConfig, Provider, SourceConfig};
use indicator::ma::{DEFAULT_MA_WINDOW, Ema, Sma};
use indicator::macd::{DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW, Macd};
use indicator::rsi::{DEFAULT_RSI_WINDOW, Rsi};
use indicator::{CloseOverlay, Indicator, IndicatorOutput};
use model::Window;
use source::MarketData;
use source::csv_file::CsvSource;
use source::yahoo::YahooSource;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("market data error")]
    Source,
    #[display("analysis error")]
    Analysis,
    #[display("output error")]
    Output,
}

#[derive(Parser)]
#[command(name = "stocklens", about = "Stock chart and indicator analyzer")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = config::load(Path::new(&cli.config)).change_context(AppError::Config)?;

    init_tracing(&config);

    if config.charts.is_empty() {
        warn!("no charts configured; nothing to do");
        return Ok(());
    }

    let source = build_source(&config.source)?;
    info!(source = source.name(), charts = config.charts.len(), "starting analysis");

    // Requests run sequentially; a failing request is logged and skipped
    // so the remaining charts still come out.
    for chart_config in &config.charts {
        match analyze(source.as_ref(), chart_config).await {
            Ok(spec) => emit(&spec)?,
            Err(report) => {
                warn!(
                    symbol = %chart_config.symbol,
                    error = ?report,
                    "chart request failed (continuing)"
                );
            }
        }
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

fn build_source(config: &SourceConfig) -> Result<Arc<dyn MarketData>, Report<AppError>> {
    let source: Arc<dyn MarketData> = match config
        .provider_kind()
        .change_context(AppError::Config)?
    {
        Provider::Csv { path } => Arc::new(CsvSource::new(&path)),
        Provider::Yahoo { timeout_secs } => Arc::new(YahooSource::new(Some(timeout_secs))),
    };
    Ok(source)
}

/// Run one analysis request: fetch, normalize, window, compute, assemble.
async fn analyze(
    source: &dyn MarketData,
    chart_config: &ChartConfig,
) -> Result<ChartSpec, Report<AppError>> {
    let symbol = chart_config.symbol.as_str();
    let window = chart_config.window();

    info!(symbol, window = ?window, "fetching history");

    // Token windows resolve against the full history's own max date;
    // explicit ranges only need the bars they cover.
    let rows = match window {
        Window::Range { start, end } => source.fetch(symbol, start, end).await,
        Window::Period(_) => source.fetch_full_history(symbol).await,
    }
    .change_context(AppError::Source)?;

    let series = loader::normalize(symbol, rows).change_context(AppError::Source)?;
    let windowed = window::select(&series, &window).change_context(AppError::Analysis)?;

    info!(symbol, bars = windowed.len(), "window selected");

    let (overlays, panels) = compute_indicators(chart_config, &windowed);

    chart::assemble(&windowed, chart_config.chart_kind(), overlays, panels)
        .change_context(AppError::Analysis)
}

/// Compute the configured indicators against the windowed series.
///
/// An indicator that cannot be computed (typically `InsufficientData` on
/// a short window) is logged and left out; the chart still renders with
/// whatever did compute.
fn compute_indicators(
    chart_config: &ChartConfig,
    series: &model::Series,
) -> (Vec<IndicatorOutput>, Vec<SubPanel>) {
    let params = &chart_config.params;
    let mut overlays = Vec::new();
    let mut panels = Vec::new();

    for name in &chart_config.indicators {
        let result = match name.as_str() {
            "close" => CloseOverlay.compute(series).map(|out| overlays.push(out)),
            "sma" => Sma::new(params.window.unwrap_or(DEFAULT_MA_WINDOW))
                .and_then(|sma| sma.compute(series))
                .map(|out| overlays.push(out)),
            "ema" => Ema::new(params.window.unwrap_or(DEFAULT_MA_WINDOW))
                .and_then(|ema| ema.compute(series))
                .map(|out| overlays.push(out)),
            "rsi" => Rsi::new(params.window.unwrap_or(DEFAULT_RSI_WINDOW))
                .and_then(|rsi| rsi.compute(series))
                .map(|out| panels.push(SubPanel::rsi(out))),
            "macd" => Macd::new(
                params.fast.unwrap_or(DEFAULT_FAST),
                params.slow.unwrap_or(DEFAULT_SLOW),
                params.signal.unwrap_or(DEFAULT_SIGNAL),
            )
            .and_then(|macd| macd.compute_full(series))
            .map(|lines| panels.push(SubPanel::macd(lines))),
            other => {
                warn!(indicator = other, "unknown indicator, skipping");
                continue;
            }
        };

        if let Err(report) = result {
            warn!(
                symbol = %chart_config.symbol,
                indicator = %name,
                error = ?report,
                "indicator skipped"
            );
        }
    }

    (overlays, panels)
}

fn emit(spec: &ChartSpec) -> Result<(), Report<AppError>> {
    let json = serde_json::to_string_pretty(spec).change_context(AppError::Output)?;
    println!("{json}");
    Ok(())
}
