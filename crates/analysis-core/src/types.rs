use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Bars for one (symbol, period, interval), strictly increasing by timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Sorts by timestamp and keeps the first bar of any duplicated timestamp.
    pub fn from_bars(mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Self { bars }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Loosely-typed provider payload ("fast info" or full info blob).
pub type InfoMap = serde_json::Map<String, serde_json::Value>;

/// First numeric value found under any of `keys`.
pub fn info_f64(info: &InfoMap, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| info.get(*k))
        .find_map(|v| v.as_f64())
}

/// First non-empty string found under any of `keys`.
pub fn info_str(info: &InfoMap, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| info.get(*k))
        .filter_map(|v| v.as_str())
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Named financial ratios. Absent means unknown, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundamentalsSnapshot {
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub market_cap: Option<f64>,
    pub eps_trailing_twelve_months: Option<f64>,
}

impl FundamentalsSnapshot {
    pub fn from_info(info: &InfoMap) -> Self {
        Self {
            trailing_pe: info_f64(info, &["trailingPE", "trailingPe"]),
            forward_pe: info_f64(info, &["forwardPE", "forwardPe"]),
            return_on_equity: info_f64(info, &["returnOnEquity"]),
            debt_to_equity: info_f64(info, &["debtToEquity"]),
            market_cap: info_f64(info, &["marketCap", "market_cap"]),
            eps_trailing_twelve_months: info_f64(
                info,
                &["epsTrailingTwelveMonths", "trailingEps"],
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Ok,
    Unavailable,
}

/// Best-effort quote; any field may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub previous_close: Option<f64>,
    pub change: Option<f64>,
    pub change_pct: Option<f64>,
    pub market_cap: Option<i64>,
    /// Unix seconds for live quotes, the dataset's `updated_at` text in demo mode.
    pub ts: Option<serde_json::Value>,
    pub status: QuoteStatus,
}

impl Quote {
    pub fn empty(symbol: impl Into<String>, ts: i64) -> Self {
        Self {
            symbol: symbol.into(),
            price: None,
            currency: None,
            previous_close: None,
            change: None,
            change_pct: None,
            market_cap: None,
            ts: Some(serde_json::Value::from(ts)),
            status: QuoteStatus::Unavailable,
        }
    }

    /// Fill `change` / `change_pct` when price and a non-zero previous close are known.
    pub fn derive_change(&mut self) {
        if let (Some(price), Some(prev)) = (self.price, self.previous_close) {
            if prev != 0.0 {
                let change = round_to(price - prev, 4);
                self.change = Some(change);
                self.change_pct = Some(round_to(100.0 * change / prev, 3));
            }
        }
    }
}

/// Round half to even at `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RsiOutput {
    pub series: Vec<f64>,
    pub latest: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub hist: Vec<f64>,
    pub hist_latest: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovingAverages {
    pub sma_50: Vec<f64>,
    pub sma_200: Vec<f64>,
    /// Only reported by the demo dataset, which stores no series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sma50_latest: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sma200_latest: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BollingerOutput {
    pub ma: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    pub ma_latest: Option<f64>,
    pub upper_latest: Option<f64>,
    pub lower_latest: Option<f64>,
}

/// Derived indicators for one price series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub rsi: RsiOutput,
    pub macd: MacdOutput,
    pub moving_averages: MovingAverages,
    pub bollinger_bands: BollingerOutput,
}

/// Categorical outcome of the rule-based scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    #[serde(rename = "Strong Buy")]
    StrongBuy,
    #[serde(rename = "Buy")]
    Buy,
    #[serde(rename = "Hold")]
    Hold,
    #[serde(rename = "Weak Hold")]
    WeakHold,
    #[serde(rename = "Sell")]
    Sell,
}

impl Signal {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 4 => Signal::StrongBuy,
            3 => Signal::Buy,
            2 => Signal::Hold,
            1 => Signal::WeakHold,
            _ => Signal::Sell,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "strong buy" => Some(Signal::StrongBuy),
            "buy" => Some(Signal::Buy),
            "hold" => Some(Signal::Hold),
            "weak hold" => Some(Signal::WeakHold),
            "sell" => Some(Signal::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub score: i32,
    pub signal: Signal,
    pub reasons: Vec<String>,
    pub technicals: IndicatorSet,
    pub fundamentals: FundamentalsSnapshot,
}
