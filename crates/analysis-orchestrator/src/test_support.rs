use analysis_core::{AnalysisError, Bar, InfoMap, Interval, MarketDataProvider, Period, PriceSeries};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Daily bars with the given closes, starting 2024-01-01.
pub fn series_of(closes: &[f64]) -> PriceSeries {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    PriceSeries::from_bars(
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: start + Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1_000.0,
            })
            .collect(),
    )
}

/// In-memory provider; anything not registered comes back empty.
#[derive(Default)]
pub struct MockProvider {
    histories: Mutex<HashMap<(String, Period, Interval), PriceSeries>>,
    fast_info: Mutex<HashMap<String, InfoMap>>,
    full_info: Mutex<HashMap<String, InfoMap>>,
    failing: Mutex<HashSet<String>>,
    failing_full: Mutex<HashSet<String>>,
    history_calls: AtomicUsize,
    info_calls: AtomicUsize,
}

impl MockProvider {
    pub fn add_history(&self, symbol: &str, period: Period, interval: Interval, series: PriceSeries) {
        self.histories
            .lock()
            .unwrap()
            .insert((symbol.to_string(), period, interval), series);
    }

    pub fn add_fast_info(&self, symbol: &str, value: serde_json::Value) {
        let map = value.as_object().cloned().unwrap_or_default();
        self.fast_info.lock().unwrap().insert(symbol.to_string(), map);
    }

    pub fn add_info(&self, symbol: &str, value: serde_json::Value) {
        let map = value.as_object().cloned().unwrap_or_default();
        self.full_info.lock().unwrap().insert(symbol.to_string(), map);
    }

    /// Every call for `symbol` returns a transport error.
    pub fn fail_symbol(&self, symbol: &str) {
        self.failing.lock().unwrap().insert(symbol.to_string());
    }

    /// Only the full-info call for `symbol` fails.
    pub fn fail_full_info(&self, symbol: &str) {
        self.failing_full.lock().unwrap().insert(symbol.to_string());
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    fn check_failing(&self, symbol: &str) -> Result<(), AnalysisError> {
        if self.failing.lock().unwrap().contains(symbol) {
            return Err(AnalysisError::ApiError(format!("connection reset for {}", symbol)));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    async fn fetch_history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries, AnalysisError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing(symbol)?;
        Ok(self
            .histories
            .lock()
            .unwrap()
            .get(&(symbol.to_string(), period, interval))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_fast_info(&self, symbol: &str) -> Result<InfoMap, AnalysisError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing(symbol)?;
        Ok(self.fast_info.lock().unwrap().get(symbol).cloned().unwrap_or_default())
    }

    async fn fetch_info(&self, symbol: &str) -> Result<InfoMap, AnalysisError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing(symbol)?;
        if self.failing_full.lock().unwrap().contains(symbol) {
            return Err(AnalysisError::ApiError("quoteSummary HTTP 500".to_string()));
        }
        Ok(self.full_info.lock().unwrap().get(symbol).cloned().unwrap_or_default())
    }
}
