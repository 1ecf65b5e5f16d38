use async_trait::async_trait;
use crate::{AnalysisError, InfoMap, Interval, Period, PriceSeries};

/// Upstream market-data source.
///
/// An empty series / map means the provider answered but had nothing for
/// `symbol`; `Err` means the call itself failed. The resolver treats both as
/// "try the next candidate" but records which one happened.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries, AnalysisError>;

    /// Lightweight quote fields (price, previous close, currency, market cap).
    async fn fetch_fast_info(&self, symbol: &str) -> Result<InfoMap, AnalysisError>;

    /// Full info blob including valuation ratios.
    async fn fetch_info(&self, symbol: &str) -> Result<InfoMap, AnalysisError>;
}
