//! Symbol / request resolution against an upstream provider that silently
//! returns nothing for malformed or exchange-ambiguous tickers.
//!
//! A bare ticker is tried as-is and then with each exchange suffix; price
//! history additionally walks a ladder of safer (period, interval) requests.
//! Calls are strictly sequential: each attempt completes before the next one
//! starts, which keeps upstream volume bounded.

use analysis_core::{
    normalize_symbol, AnalysisError, Attempt, AttemptOutcome, InfoMap, Interval,
    MarketDataProvider, Period, PriceSeries,
};
use std::sync::Arc;

use crate::cache::TtlCache;

/// Separator between ticker and exchange marker (e.g. `RELIANCE.NS`).
pub const SUFFIX_SEPARATOR: char = '.';

/// Values stored in the shared cache.
#[derive(Debug, Clone)]
pub enum CachedValue {
    History(PriceSeries),
    Info(InfoMap),
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Appended, in order, to tickers that carry no exchange marker.
    pub exchange_suffixes: Vec<String>,
    /// Tried after the caller's own (period, interval).
    pub fallback_requests: Vec<(Period, Interval)>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            exchange_suffixes: vec![".NS".to_string(), ".BO".to_string()],
            fallback_requests: vec![
                (Period::SixMonths, Interval::OneDay),
                (Period::ThreeMonths, Interval::OneDay),
                (Period::OneMonth, Interval::OneDay),
                (Period::OneYear, Interval::OneWeek),
                (Period::Max, Interval::OneWeek),
            ],
        }
    }
}

/// Candidate spellings for a normalized symbol, most likely first.
pub fn symbol_candidates(symbol: &str, suffixes: &[String]) -> Vec<String> {
    if symbol.contains(SUFFIX_SEPARATOR) {
        return vec![symbol.to_string()];
    }
    std::iter::once(symbol.to_string())
        .chain(suffixes.iter().map(|s| format!("{}{}", symbol, s)))
        .collect()
}

/// The requested pair followed by the fallbacks, without repeats.
pub fn request_ladder(
    period: Period,
    interval: Interval,
    fallbacks: &[(Period, Interval)],
) -> Vec<(Period, Interval)> {
    let mut ladder = vec![(period, interval)];
    for combo in fallbacks {
        if !ladder.contains(combo) {
            ladder.push(*combo);
        }
    }
    ladder
}

pub fn history_cache_key(symbol: &str, period: Period, interval: Interval) -> String {
    format!("hist:{}:{}:{}", symbol, period, interval)
}

pub fn info_cache_key(symbol: &str) -> String {
    format!("info:{}", symbol)
}

pub struct Resolver {
    provider: Arc<dyn MarketDataProvider>,
    cache: Arc<TtlCache<CachedValue>>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        cache: Arc<TtlCache<CachedValue>>,
        config: ResolverConfig,
    ) -> Self {
        Self { provider, cache, config }
    }

    pub fn candidates(&self, symbol: &str) -> Vec<String> {
        symbol_candidates(symbol, &self.config.exchange_suffixes)
    }

    /// Resolve a non-empty price series, cache-first.
    ///
    /// Cached under the normalized *requested* symbol and parameters, so the
    /// next call hits the cache whichever candidate won.
    pub async fn resolve_history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries, AnalysisError> {
        let symbol = require_symbol(symbol)?;
        let key = history_cache_key(&symbol, period, interval);
        if let Some(CachedValue::History(series)) = self.cache.get(&key) {
            tracing::debug!("history cache hit for {}", key);
            return Ok(series);
        }

        let ladder = request_ladder(period, interval, &self.config.fallback_requests);
        let mut attempts = Vec::new();

        for candidate in self.candidates(&symbol) {
            for &(p, iv) in &ladder {
                let outcome = match self.provider.fetch_history(&candidate, p, iv).await {
                    Ok(series) if !series.is_empty() => {
                        tracing::info!(
                            "Resolved {} history via {}({},{}) after {} failed attempts ({} bars)",
                            symbol, candidate, p, iv, attempts.len(), series.len()
                        );
                        self.cache.set(key, CachedValue::History(series.clone()));
                        return Ok(series);
                    }
                    Ok(_) => AttemptOutcome::Empty,
                    Err(e) => {
                        tracing::debug!("history attempt {}({},{}) failed: {}", candidate, p, iv, e);
                        AttemptOutcome::Failed(e.to_string())
                    }
                };
                attempts.push(Attempt {
                    candidate: candidate.clone(),
                    period: Some(p),
                    interval: Some(iv),
                    outcome,
                });
            }
        }

        tracing::warn!("No price history for {} after {} attempts", symbol, attempts.len());
        Err(AnalysisError::HistoryNotFound { symbol, attempts })
    }

    /// Resolve the merged fast-info + full-info blob, cache-first.
    pub async fn resolve_info(&self, symbol: &str) -> Result<InfoMap, AnalysisError> {
        let symbol = require_symbol(symbol)?;
        let key = info_cache_key(&symbol);
        if let Some(CachedValue::Info(info)) = self.cache.get(&key) {
            tracing::debug!("info cache hit for {}", key);
            return Ok(info);
        }

        let mut attempts = Vec::new();

        for candidate in self.candidates(&symbol) {
            let mut info = match self.provider.fetch_fast_info(&candidate).await {
                Ok(fast) => fast,
                Err(e) => {
                    tracing::debug!("fast info for {} failed: {}", candidate, e);
                    attempts.push(Attempt {
                        candidate,
                        period: None,
                        interval: None,
                        outcome: AttemptOutcome::Failed(e.to_string()),
                    });
                    continue;
                }
            };

            // The full blob is best-effort on top of fast info
            match self.provider.fetch_info(&candidate).await {
                Ok(full) => info.extend(full),
                Err(e) => tracing::debug!("full info for {} failed: {}", candidate, e),
            }

            if !info.is_empty() {
                tracing::info!("Resolved {} info via {} ({} fields)", symbol, candidate, info.len());
                self.cache.set(key, CachedValue::Info(info.clone()));
                return Ok(info);
            }

            attempts.push(Attempt {
                candidate,
                period: None,
                interval: None,
                outcome: AttemptOutcome::Empty,
            });
        }

        tracing::warn!("No info for {} after {} candidates", symbol, attempts.len());
        Err(AnalysisError::InfoNotFound { symbol, attempts })
    }
}

fn require_symbol(symbol: &str) -> Result<String, AnalysisError> {
    let symbol = normalize_symbol(symbol);
    if symbol.is_empty() {
        return Err(AnalysisError::InvalidRequest("symbol is required".to_string()));
    }
    Ok(symbol)
}
