use analysis_core::{
    info_f64, info_str, normalize_symbol, InfoMap, Interval, MarketDataProvider, Period, Quote,
    QuoteStatus,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::resolver::symbol_candidates;

pub const DEFAULT_CHUNK_SIZE: usize = 25;
pub const DEFAULT_DELAY_MS: u64 = 200;

const PRICE_KEYS: &[&str] = &["last_price", "lastPrice", "last_trade", "regularMarketPrice"];
const PREV_CLOSE_KEYS: &[&str] = &["previous_close", "previousClose", "regularMarketPreviousClose"];
const MARKET_CAP_KEYS: &[&str] = &["market_cap", "marketCap"];

/// Best-effort quotes for many symbols, chunked to stay under upstream rate limits.
pub struct BatchQuoteFetcher {
    provider: Arc<dyn MarketDataProvider>,
    exchange_suffixes: Vec<String>,
}

impl BatchQuoteFetcher {
    pub fn new(provider: Arc<dyn MarketDataProvider>, exchange_suffixes: Vec<String>) -> Self {
        Self { provider, exchange_suffixes }
    }

    /// One quote per non-blank input symbol, in input order. Symbols that cannot
    /// be resolved stay in the output with absent fields.
    ///
    /// Waits `delay` between chunks; no wait follows the final chunk.
    pub async fn fetch_quotes(&self, symbols: &[String], chunk_size: usize, delay: Duration) -> Vec<Quote> {
        let symbols: Vec<String> = symbols
            .iter()
            .map(|s| normalize_symbol(s))
            .filter(|s| !s.is_empty())
            .collect();
        let chunk_size = chunk_size.max(1);
        let ts = Utc::now().timestamp();
        let total_chunks = symbols.len().div_ceil(chunk_size);

        let mut out = Vec::with_capacity(symbols.len());
        for (i, chunk) in symbols.chunks(chunk_size).enumerate() {
            tracing::debug!("Fetching quote chunk {}/{} ({} symbols)", i + 1, total_chunks, chunk.len());
            for symbol in chunk {
                out.push(self.fetch_one(symbol, ts).await);
            }

            if i + 1 < total_chunks && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let resolved = out.iter().filter(|q| q.price.is_some()).count();
        tracing::info!("Fetched {} quotes ({} priced)", out.len(), resolved);
        out
    }

    /// Walk the candidates until one yields a price.
    pub async fn fetch_one(&self, symbol: &str, ts: i64) -> Quote {
        let mut quote = Quote::empty(symbol, ts);
        let mut fallback: Option<(Option<String>, Option<i64>)> = None;

        for candidate in symbol_candidates(symbol, &self.exchange_suffixes) {
            let fast = match self.provider.fetch_fast_info(&candidate).await {
                Ok(info) => info,
                Err(e) => {
                    tracing::debug!("fast quote for {} failed: {}", candidate, e);
                    InfoMap::new()
                }
            };

            let mut price = price_from(&fast);
            let mut prev = info_f64(&fast, PREV_CLOSE_KEYS);

            if price.is_none() {
                match self.provider.fetch_history(&candidate, Period::FiveDays, Interval::OneDay).await {
                    Ok(series) => {
                        let closes = series.closes();
                        if let Some(&last) = closes.last() {
                            price = Some(last);
                            prev = closes.len().checked_sub(2).map(|i| closes[i]);
                        }
                    }
                    Err(e) => tracing::debug!("history fallback for {} failed: {}", candidate, e),
                }
            }

            let currency = info_str(&fast, &["currency"]);
            let market_cap = info_f64(&fast, MARKET_CAP_KEYS)
                .filter(|m| m.is_finite() && *m != 0.0)
                .map(|m| m as i64);

            if let Some(price) = price {
                quote.price = Some(price);
                quote.previous_close = prev;
                quote.currency = currency;
                quote.market_cap = market_cap;
                quote.derive_change();
                quote.status = QuoteStatus::Ok;
                return quote;
            }

            // unpriced rows keep the metadata of the first candidate that had any
            if fallback.is_none() && (currency.is_some() || market_cap.is_some()) {
                fallback = Some((currency, market_cap));
            }
        }

        if let Some((currency, market_cap)) = fallback {
            quote.currency = currency;
            quote.market_cap = market_cap;
        }
        quote
    }
}

/// Zero and non-finite prices count as missing.
fn price_from(info: &InfoMap) -> Option<f64> {
    PRICE_KEYS
        .iter()
        .filter_map(|k| info.get(*k))
        .filter_map(|v| v.as_f64())
        .find(|p| p.is_finite() && *p != 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{series_of, MockProvider};
    use serde_json::json;

    fn fetcher(provider: Arc<MockProvider>) -> BatchQuoteFetcher {
        BatchQuoteFetcher::new(provider, vec![".NS".to_string(), ".BO".to_string()])
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_fast_info_quote() {
        let provider = Arc::new(MockProvider::default());
        provider.add_fast_info("AAPL", json!({
            "regularMarketPrice": 190.5,
            "regularMarketPreviousClose": 188.0,
            "currency": "USD",
            "marketCap": 2.9e12
        }));

        let quotes = fetcher(provider.clone())
            .fetch_quotes(&symbols(&["aapl"]), 25, Duration::ZERO)
            .await;

        assert_eq!(quotes.len(), 1);
        let q = &quotes[0];
        assert_eq!(q.symbol, "AAPL");
        assert_eq!(q.price, Some(190.5));
        assert_eq!(q.previous_close, Some(188.0));
        assert_eq!(q.change, Some(2.5));
        assert_eq!(q.change_pct, Some(1.33));
        assert_eq!(q.currency.as_deref(), Some("USD"));
        assert_eq!(q.market_cap, Some(2_900_000_000_000));
        assert_eq!(q.status, QuoteStatus::Ok);
        assert_eq!(provider.history_calls(), 0);
    }

    #[tokio::test]
    async fn test_history_fallback_uses_last_two_closes() {
        let provider = Arc::new(MockProvider::default());
        provider.add_fast_info("TCS.NS", json!({ "currency": "INR" }));
        provider.add_history("TCS.NS", Period::FiveDays, Interval::OneDay, series_of(&[3900.0, 4000.0, 4100.0]));

        let q = fetcher(provider).fetch_one("TCS", 1).await;

        assert_eq!(q.price, Some(4100.0));
        assert_eq!(q.previous_close, Some(4000.0));
        assert_eq!(q.change, Some(100.0));
        assert_eq!(q.change_pct, Some(2.5));
        assert_eq!(q.currency.as_deref(), Some("INR"));
    }

    #[tokio::test]
    async fn test_quote_fields_come_from_the_priced_candidate() {
        let provider = Arc::new(MockProvider::default());
        provider.add_fast_info("TCS", json!({ "currency": "USD", "marketCap": 5 }));
        provider.add_fast_info("TCS.NS", json!({
            "regularMarketPrice": 4000.0,
            "currency": "INR",
            "marketCap": 1.4e13
        }));

        let q = fetcher(provider).fetch_one("TCS", 1).await;

        assert_eq!(q.price, Some(4000.0));
        assert_eq!(q.currency.as_deref(), Some("INR"));
        assert_eq!(q.market_cap, Some(14_000_000_000_000));
        assert_eq!(q.status, QuoteStatus::Ok);
    }

    #[tokio::test]
    async fn test_unpriced_symbol_keeps_first_metadata() {
        let provider = Arc::new(MockProvider::default());
        provider.add_fast_info("ZEE", json!({ "currency": "USD" }));
        provider.add_fast_info("ZEE.NS", json!({ "currency": "INR", "marketCap": 3.0e9 }));

        let q = fetcher(provider).fetch_one("ZEE", 1).await;

        assert_eq!(q.price, None);
        assert_eq!(q.status, QuoteStatus::Unavailable);
        assert_eq!(q.currency.as_deref(), Some("USD"));
        assert_eq!(q.market_cap, None);
    }

    #[tokio::test]
    async fn test_single_close_leaves_change_absent() {
        let provider = Arc::new(MockProvider::default());
        provider.add_history("NEWCO", Period::FiveDays, Interval::OneDay, series_of(&[12.0]));

        let q = fetcher(provider).fetch_one("NEWCO", 1).await;

        assert_eq!(q.price, Some(12.0));
        assert_eq!(q.previous_close, None);
        assert_eq!(q.change, None);
        assert_eq!(q.change_pct, None);
    }

    #[tokio::test]
    async fn test_unresolved_symbols_stay_in_output() {
        let provider = Arc::new(MockProvider::default());
        provider.fail_symbol("BAD");
        provider.add_fast_info("GOOD", json!({ "regularMarketPrice": 10.0 }));

        let quotes = fetcher(provider)
            .fetch_quotes(&symbols(&["bad", "", "  ", "good", "missing"]), 2, Duration::ZERO)
            .await;

        let names: Vec<&str> = quotes.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(names, vec!["BAD", "GOOD", "MISSING"]);
        assert_eq!(quotes[0].price, None);
        assert_eq!(quotes[0].status, QuoteStatus::Unavailable);
        assert_eq!(quotes[1].price, Some(10.0));
        assert_eq!(quotes[1].change, None);
        assert_eq!(quotes[2].price, None);
        // same batch timestamp for every row
        assert!(quotes.iter().all(|q| q.ts == quotes[0].ts));
    }

    #[tokio::test]
    async fn test_zero_price_in_fast_info_counts_as_missing() {
        let provider = Arc::new(MockProvider::default());
        provider.add_fast_info("HALT", json!({ "regularMarketPrice": 0.0 }));
        provider.add_history("HALT", Period::FiveDays, Interval::OneDay, series_of(&[7.0, 8.0]));

        let q = fetcher(provider).fetch_one("HALT", 1).await;
        assert_eq!(q.price, Some(8.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_chunks_only() {
        let provider = Arc::new(MockProvider::default());
        let f = fetcher(provider);
        let start = tokio::time::Instant::now();

        let quotes = f
            .fetch_quotes(&symbols(&["A.NS", "B.NS", "C.NS"]), 2, Duration::from_millis(200))
            .await;

        assert_eq!(quotes.len(), 3);
        // two chunks -> exactly one pause
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(400));
    }
}
