use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use error_stack::{Report, ResultExt, bail};
use futures::future::BoxFuture;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::source::{MarketData, RawBar};

const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
/// Unofficial endpoint; keep the request rate conservative.
const YAHOO_REQUESTS_PER_SECOND: NonZeroU32 = nonzero!(5u32);
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Market data source backed by the Yahoo Finance v8 chart API.
pub struct YahooSource {
    client: reqwest::Client,
    base_url: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl YahooSource {
    pub fn new(timeout_secs: Option<u64>) -> Self {
        let quota = Quota::per_second(YAHOO_REQUESTS_PER_SECOND);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .expect("http client with request timeout");
        Self {
            client,
            base_url: YAHOO_BASE_URL.to_owned(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<RawBar>, Report<SourceError>> {
        // Wait for rate limiter before making the request
        self.rate_limiter.until_ready().await;

        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .change_context(SourceError::DataUnavailable {
                symbol: symbol.to_owned(),
            })
            .attach("request failed or timed out")?;

        // Yahoo answers 404 for symbols it does not know
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            bail!(SourceError::InvalidSymbol {
                symbol: symbol.to_owned(),
            });
        }
        if !response.status().is_success() {
            return Err(Report::new(SourceError::DataUnavailable {
                symbol: symbol.to_owned(),
            })
            .attach(format!("HTTP status: {}", response.status())));
        }

        let payload: ChartResponse =
            response
                .json()
                .await
                .change_context(SourceError::DataUnavailable {
                    symbol: symbol.to_owned(),
                })
                .attach("response decode failed")?;

        let rows = convert_payload(symbol, payload)?;

        info!(symbol, rows = rows.len(), "yahoo chart fetch complete");
        Ok(rows)
    }
}

impl MarketData for YahooSource {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BoxFuture<'_, Result<Vec<RawBar>, Report<SourceError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            // period2 is exclusive upstream; push it one day past `end`
            let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
            let period2 = (end + chrono::Duration::days(1))
                .and_time(NaiveTime::MIN)
                .and_utc()
                .timestamp();
            let params = [
                ("interval", "1d".to_owned()),
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
            ];
            self.fetch_chart(&symbol, &params).await
        })
    }

    fn fetch_full_history(
        &self,
        symbol: &str,
    ) -> BoxFuture<'_, Result<Vec<RawBar>, Report<SourceError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let params = [("interval", "1d".to_owned()), ("range", "max".to_owned())];
            self.fetch_chart(&symbol, &params).await
        })
    }
}

// ── Wire format ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Meta {
    /// Seconds east of UTC for the instrument's exchange.
    #[serde(default)]
    gmtoffset: i32,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

/// Parallel arrays; entries are null on non-trading rows.
#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Flatten Yahoo's parallel-array layout into rows, timestamped in the
/// exchange's own offset so the loader truncates to local trading dates.
fn convert_payload(
    symbol: &str,
    payload: ChartResponse,
) -> Result<Vec<RawBar>, Report<SourceError>> {
    if let Some(error) = payload.chart.error {
        debug!(symbol, code = %error.code, description = %error.description, "yahoo api error");
        if error.code == "Not Found" {
            bail!(SourceError::InvalidSymbol {
                symbol: symbol.to_owned(),
            });
        }
        return Err(Report::new(SourceError::DataUnavailable {
            symbol: symbol.to_owned(),
        })
        .attach(format!("{}: {}", error.code, error.description)));
    }

    let Some(result) = payload
        .chart
        .result
        .and_then(|mut results| (!results.is_empty()).then(|| results.remove(0)))
    else {
        bail!(SourceError::DataUnavailable {
            symbol: symbol.to_owned(),
        });
    };

    let offset = FixedOffset::east_opt(result.meta.gmtoffset).unwrap_or_else(|| Utc.fix());
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let rows = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let timestamp = epoch_with_offset(ts, offset)?;
            Some(RawBar {
                timestamp,
                open: field(&quote.open, i),
                high: field(&quote.high, i),
                low: field(&quote.low, i),
                close: field(&quote.close, i),
                volume: field(&quote.volume, i),
            })
        })
        .collect();

    Ok(rows)
}

fn epoch_with_offset(ts: i64, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.with_timezone(&offset))
}

fn field<T: Copy>(values: &[Option<T>], i: usize) -> Option<T> {
    values.get(i).copied().flatten()
}
