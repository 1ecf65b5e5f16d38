//! Live market-data service: symbol resolution, caching, indicators, rule-based
//! summaries and batch quotes on top of any [`MarketDataProvider`].

use analysis_core::{
    AnalysisError, FundamentalsSnapshot, IndicatorSet, Interval, MarketDataProvider, Period,
    Quote, Summary,
};
use std::sync::Arc;
use std::time::Duration;
use technical_analysis::TechnicalAnalysisEngine;

pub mod cache;
pub mod quotes;
pub mod resolver;
pub mod summary;

#[cfg(test)]
mod test_support;

pub use cache::{TtlCache, DEFAULT_MAX_SIZE, DEFAULT_TTL_SECS};
pub use quotes::{BatchQuoteFetcher, DEFAULT_CHUNK_SIZE, DEFAULT_DELAY_MS};
pub use resolver::{CachedValue, Resolver, ResolverConfig};
pub use summary::build_summary;

pub struct MarketDataService {
    resolver: Resolver,
    quotes: BatchQuoteFetcher,
    engine: TechnicalAnalysisEngine,
}

impl MarketDataService {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        cache: Arc<TtlCache<CachedValue>>,
        config: ResolverConfig,
    ) -> Self {
        let quotes = BatchQuoteFetcher::new(provider.clone(), config.exchange_suffixes.clone());
        Self {
            resolver: Resolver::new(provider, cache, config),
            quotes,
            engine: TechnicalAnalysisEngine::new(),
        }
    }

    pub async fn technicals(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<IndicatorSet, AnalysisError> {
        let series = self.resolver.resolve_history(symbol, period, interval).await?;
        Ok(self.engine.analyze(&series))
    }

    pub async fn fundamentals(&self, symbol: &str) -> Result<FundamentalsSnapshot, AnalysisError> {
        let info = self.resolver.resolve_info(symbol).await?;
        Ok(FundamentalsSnapshot::from_info(&info))
    }

    /// Technicals over one year of daily bars, fundamentals, and the score over both.
    pub async fn summary(&self, symbol: &str) -> Result<Summary, AnalysisError> {
        let technicals = self.technicals(symbol, Period::OneYear, Interval::OneDay).await?;
        let fundamentals = self.fundamentals(symbol).await?;
        Ok(build_summary(technicals, fundamentals))
    }

    pub async fn quotes_batch(&self, symbols: &[String], chunk_size: usize, delay_ms: u64) -> Vec<Quote> {
        self.quotes
            .fetch_quotes(symbols, chunk_size, Duration::from_millis(delay_ms))
            .await
    }
}
