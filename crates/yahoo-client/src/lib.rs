use analysis_core::{AnalysisError, Bar, InfoMap, Interval, MarketDataProvider, Period, PriceSeries};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://query2.finance.yahoo.com";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
/// Requests per minute when the caller has no preference.
pub const DEFAULT_RATE_LIMIT: usize = 120;

const SUMMARY_MODULES: &str = "summaryDetail,financialData,defaultKeyStatistics,price";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let oldest = match ts.front() {
                Some(&t) => t,
                None => continue,
            };
            let sleep_dur = (oldest + self.window).saturating_duration_since(now)
                + Duration::from_millis(50);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Yahoo slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Yahoo Finance client (chart, quote and quoteSummary endpoints).
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
    crumb: Arc<Mutex<Option<String>>>,
}

impl YahooClient {
    /// `rate_limit` is the number of requests allowed per minute.
    pub fn new(rate_limit: usize) -> Result<Self, AnalysisError> {
        Self::with_base_url(BASE_URL, rate_limit)
    }

    pub fn with_base_url(base_url: impl Into<String>, rate_limit: usize) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|e| AnalysisError::ApiError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
            crumb: Arc::new(Mutex::new(None)),
        })
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AnalysisError> {
        let request = builder.build().map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request.try_clone()
                .ok_or_else(|| AnalysisError::ApiError("Cannot clone request".to_string()))?;
            let response = self.client.execute(req_clone).await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            let wait_secs = 2u64 << attempt;
            tracing::warn!("Yahoo 429 rate limited, waiting {}s before retry {}/3", wait_secs, attempt + 1);
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(AnalysisError::ApiError("Rate limited by Yahoo after 3 retries".to_string()))
    }

    /// Session crumb required by the quote endpoints; fetched once and reused.
    async fn crumb(&self) -> Result<String, AnalysisError> {
        let mut guard = self.crumb.lock().await;
        if let Some(crumb) = guard.as_ref() {
            return Ok(crumb.clone());
        }

        // Only the Set-Cookie matters here; the page itself is usually a 404.
        let _ = self.send_request(self.client.get(COOKIE_URL)).await?;

        let response = self
            .send_request(self.client.get(format!("{}/v1/test/getcrumb", self.base_url)))
            .await?;
        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!("crumb request failed: HTTP {}", response.status())));
        }
        let crumb = response
            .text()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?
            .trim()
            .to_string();
        if crumb.is_empty() || crumb.contains('<') {
            return Err(AnalysisError::ApiError("Yahoo returned an invalid crumb".to_string()));
        }

        tracing::debug!("Obtained Yahoo crumb");
        *guard = Some(crumb.clone());
        Ok(crumb)
    }

    async fn invalidate_crumb(&self) {
        *self.crumb.lock().await = None;
    }

    /// GET with the crumb attached, refreshing it once on 401.
    async fn get_with_crumb(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, AnalysisError> {
        for attempt in 0..2 {
            let crumb = self.crumb().await?;
            let response = self
                .send_request(self.client.get(url).query(query).query(&[("crumb", crumb.as_str())]))
                .await?;
            if response.status() == StatusCode::UNAUTHORIZED && attempt == 0 {
                tracing::debug!("Yahoo crumb rejected, refreshing");
                self.invalidate_crumb().await;
                continue;
            }
            return Ok(response);
        }
        Err(AnalysisError::ApiError("Yahoo rejected the session crumb".to_string()))
    }

    /// Get bars for a symbol over `period` sampled every `interval`.
    pub async fn get_chart(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries, AnalysisError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let response = self.send_request(
            self.client.get(&url).query(&[
                ("range", period.as_str()),
                ("interval", interval.as_str()),
                ("includePrePost", "false"),
                ("events", ""),
            ])
        ).await?;

        // Unknown tickers come back as 404 with a "Not Found" chart error
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(PriceSeries::default());
        }
        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let chart: ChartResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        parse_chart(chart)
    }

    /// Get the v7 quote object for a symbol ("fast info").
    pub async fn get_quote(&self, symbol: &str) -> Result<InfoMap, AnalysisError> {
        let url = format!("{}/v7/finance/quote", self.base_url);
        let response = self.get_with_crumb(&url, &[("symbols", symbol)]).await?;

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "Quote HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let quote: QuoteResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(quote.quote_response.result.into_iter().next().unwrap_or_default())
    }

    /// Get the quoteSummary modules for a symbol, flattened into one map.
    pub async fn get_quote_summary(&self, symbol: &str) -> Result<InfoMap, AnalysisError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);
        let response = self.get_with_crumb(&url, &[("modules", SUMMARY_MODULES)]).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(InfoMap::new());
        }
        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "QuoteSummary HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let summary: QuoteSummaryResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(flatten_quote_summary(summary))
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn fetch_history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries, AnalysisError> {
        self.get_chart(symbol, period, interval).await
    }

    async fn fetch_fast_info(&self, symbol: &str) -> Result<InfoMap, AnalysisError> {
        self.get_quote(symbol).await
    }

    async fn fetch_info(&self, symbol: &str) -> Result<InfoMap, AnalysisError> {
        self.get_quote_summary(symbol).await
    }
}

fn parse_chart(chart: ChartResponse) -> Result<PriceSeries, AnalysisError> {
    if let Some(err) = chart.chart.error {
        if err.code == "Not Found" {
            return Ok(PriceSeries::default());
        }
        return Err(AnalysisError::ApiError(format!("{}: {}", err.code, err.description)));
    }

    let data = match chart.chart.result.and_then(|r| r.into_iter().next()) {
        Some(d) => d,
        None => return Ok(PriceSeries::default()),
    };
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = match data.indicators.quote.into_iter().next() {
        Some(q) => q,
        None => return Ok(PriceSeries::default()),
    };

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        // Rows without a close are non-trading placeholders
        let close = match quote.close.get(i).copied().flatten() {
            Some(c) if c.is_finite() => c,
            _ => continue,
        };
        let timestamp = match DateTime::from_timestamp(ts, 0) {
            Some(t) => t,
            None => continue,
        };

        bars.push(Bar {
            timestamp,
            open: quote.open.get(i).copied().flatten().unwrap_or(close),
            high: quote.high.get(i).copied().flatten().unwrap_or(close),
            low: quote.low.get(i).copied().flatten().unwrap_or(close),
            close,
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0.0),
        });
    }

    Ok(PriceSeries::from_bars(bars))
}

/// Merge every module of the first result into one map, unwrapping `{raw, fmt}` values.
fn flatten_quote_summary(summary: QuoteSummaryResponse) -> InfoMap {
    let mut info = InfoMap::new();
    let result = match summary.quote_summary.result.and_then(|r| r.into_iter().next()) {
        Some(r) => r,
        None => return info,
    };

    for (_module, fields) in result {
        let Value::Object(fields) = fields else { continue };
        for (key, value) in fields {
            match value {
                Value::Object(obj) => {
                    if let Some(raw) = obj.get("raw") {
                        info.insert(key, raw.clone());
                    }
                }
                Value::Null => {}
                other => {
                    info.insert(key, other);
                }
            }
        }
    }

    info
}

// Response structures
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteResult,
}

#[derive(Debug, Deserialize)]
struct QuoteResult {
    #[serde(default)]
    result: Vec<InfoMap>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryResult,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    result: Option<Vec<InfoMap>>,
}
