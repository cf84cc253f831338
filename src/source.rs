pub mod csv_file;
pub mod yahoo;

use chrono::{DateTime, FixedOffset, NaiveDate};
use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::SourceError;

/// One unnormalized row as the upstream source delivered it.
///
/// Sources may emit rows with missing fields (non-trading days, partial
/// data); the loader decides what to do with them. Timestamps keep the
/// source's own offset so the loader can truncate to a calendar date
/// without shifting zones.
#[derive(Debug, Clone)]
pub struct RawBar {
    pub timestamp: DateTime<FixedOffset>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

/// Abstraction over a market data source.
///
/// Uses `BoxFuture` (from `futures` crate) instead of `async fn` in trait
/// to keep the trait object-safe (`dyn MarketData`).
pub trait MarketData: Send + Sync {
    /// Short name of the source (for logging).
    fn name(&self) -> &str;

    /// Fetch daily rows with `start <= date <= end`.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BoxFuture<'_, Result<Vec<RawBar>, Report<SourceError>>>;

    /// Fetch every daily row the source has for `symbol`.
    fn fetch_full_history(
        &self,
        symbol: &str,
    ) -> BoxFuture<'_, Result<Vec<RawBar>, Report<SourceError>>>;
}
