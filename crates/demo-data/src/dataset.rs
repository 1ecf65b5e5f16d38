use analysis_core::{
    BollingerOutput, FundamentalsSnapshot, IndicatorSet, MacdOutput, MovingAverages, Quote,
    QuoteStatus, RsiOutput, Signal, Summary,
};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::DemoDataError;
use crate::page::Page;
use crate::parse::{parse_cell, Parsed};

pub const DEFAULT_CURRENCY: &str = "INR";
pub const DEFAULT_RECOMMENDATION: Signal = Signal::Hold;
pub const REASON_LOW_DEBT: &str = "Low debt";

/// One pre-computed snapshot row. Numeric cells that were blank or unparsable are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemoRow {
    pub symbol: String,
    pub currency: Option<String>,
    pub updated_at: Option<String>,
    pub recommendation: Option<String>,
    pub price: Option<f64>,
    pub previous_close: Option<f64>,
    pub change: Option<f64>,
    pub change_pct: Option<f64>,
    pub market_cap: Option<i64>,
    pub pe: Option<f64>,
    pub roe: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub eps: Option<f64>,
    pub rsi: Option<f64>,
    pub macd_hist: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub bb_ma: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    pub recommendation_score: Option<i64>,
}

impl DemoRow {
    pub fn quote(&self) -> Quote {
        Quote {
            symbol: self.symbol.clone(),
            price: self.price,
            currency: Some(
                self.currency
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            ),
            previous_close: self.previous_close,
            change: self.change,
            change_pct: self.change_pct,
            market_cap: self.market_cap,
            ts: self.updated_at.clone().map(serde_json::Value::String),
            status: QuoteStatus::Ok,
        }
    }

    pub fn fundamentals(&self) -> FundamentalsSnapshot {
        FundamentalsSnapshot {
            trailing_pe: self.pe,
            forward_pe: None,
            return_on_equity: self.roe,
            debt_to_equity: self.debt_to_equity,
            market_cap: self.market_cap.map(|m| m as f64),
            eps_trailing_twelve_months: self.eps,
        }
    }

    /// Stored latest values only; the snapshot carries no series.
    pub fn technicals(&self) -> IndicatorSet {
        IndicatorSet {
            rsi: RsiOutput {
                series: Vec::new(),
                latest: self.rsi,
            },
            macd: MacdOutput {
                hist_latest: self.macd_hist,
                ..Default::default()
            },
            moving_averages: MovingAverages {
                sma50_latest: self.sma_50,
                sma200_latest: self.sma_200,
                ..Default::default()
            },
            bollinger_bands: BollingerOutput {
                ma_latest: self.bb_ma,
                upper_latest: self.bb_upper,
                lower_latest: self.bb_lower,
                ..Default::default()
            },
        }
    }

    /// Stored recommendation plus reasons re-derived from the stored metrics.
    ///
    /// Debt is judged as a plain ratio here (`< 1.0`), unlike the live scorer.
    pub fn summary(&self) -> Summary {
        let mut reasons = Vec::new();
        if self.rsi.is_some_and(|r| (45.0..=60.0).contains(&r)) {
            reasons.push("RSI in neutral-to-positive zone".to_string());
        }
        if self.macd_hist.is_some_and(|h| h > 0.0) {
            reasons.push("MACD histogram positive (bullish momentum)".to_string());
        }
        if self.pe.is_some_and(|pe| pe > 0.0 && pe < 35.0) {
            reasons.push("Reasonable P/E valuation".to_string());
        }
        if self.roe.is_some_and(|roe| roe > 0.12) {
            reasons.push("Healthy ROE (>12%)".to_string());
        }
        if self.debt_to_equity.is_some_and(|de| de < 1.0) {
            reasons.push(REASON_LOW_DEBT.to_string());
        }

        let score = self
            .recommendation_score
            .and_then(|s| i32::try_from(s).ok())
            .unwrap_or(0);
        let signal = self
            .recommendation
            .as_deref()
            .and_then(Signal::from_label)
            .unwrap_or(DEFAULT_RECOMMENDATION);

        Summary {
            score,
            signal,
            reasons,
            technicals: self.technicals(),
            fundamentals: self.fundamentals(),
        }
    }
}

/// The whole static snapshot, in file order.
#[derive(Debug, Clone, Default)]
pub struct DemoDataset {
    rows: Vec<DemoRow>,
}

impl DemoDataset {
    pub fn load(path: &Path) -> Result<Self, DemoDataError> {
        if !path.exists() {
            return Err(DemoDataError::DatasetMissing(path.to_path_buf()));
        }
        let file = std::fs::File::open(path)?;
        let dataset = Self::from_reader(file)?;
        tracing::info!("Loaded {} demo rows from {}", dataset.rows.len(), path.display());
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DemoDataError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns: HashMap<String, usize> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_string(), i))
            .collect();
        if !columns.contains_key("symbol") {
            return Err(DemoDataError::MissingColumn("symbol".to_string()));
        }

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let text = |name: &str| -> Option<String> {
                columns
                    .get(name)
                    .and_then(|&i| record.get(i))
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };
            let f = |name: &str| number::<f64>(&columns, &record, name, line);
            let int = |name: &str| number::<i64>(&columns, &record, name, line);

            rows.push(DemoRow {
                symbol: text("symbol").unwrap_or_default(),
                currency: text("currency"),
                updated_at: text("updated_at"),
                recommendation: text("recommendation"),
                price: f("price"),
                previous_close: f("previous_close"),
                change: f("change"),
                change_pct: f("change_pct"),
                market_cap: int("market_cap"),
                pe: f("pe"),
                roe: f("roe"),
                debt_to_equity: f("debt_to_equity"),
                eps: f("eps"),
                rsi: f("rsi"),
                macd_hist: f("macd_hist"),
                sma_50: f("sma_50"),
                sma_200: f("sma_200"),
                bb_ma: f("bb_ma"),
                bb_upper: f("bb_upper"),
                bb_lower: f("bb_lower"),
                recommendation_score: int("recommendation_score"),
            });
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[DemoRow] {
        &self.rows
    }

    /// Exact (case-insensitive) symbol first, then a match on the part before the exchange suffix.
    pub fn find_row(&self, symbol: &str) -> Option<&DemoRow> {
        let wanted = symbol.trim().to_uppercase();
        if let Some(row) = self.rows.iter().find(|r| r.symbol.to_uppercase() == wanted) {
            return Some(row);
        }
        let base = base_symbol(&wanted);
        self.rows
            .iter()
            .find(|r| base_symbol(&r.symbol.to_uppercase()) == base)
    }

    fn require_row(&self, symbol: &str) -> Result<&DemoRow, DemoDataError> {
        self.find_row(symbol)
            .ok_or_else(|| DemoDataError::SymbolNotFound(symbol.to_string()))
    }

    /// Symbols containing `q` (case-insensitive), paged. Rows without a symbol are skipped.
    pub fn list_symbols(&self, q: &str, limit: Option<usize>, offset: usize) -> Page<String> {
        let q = q.trim().to_uppercase();
        let symbols: Vec<String> = self
            .rows
            .iter()
            .filter(|r| !r.symbol.is_empty())
            .filter(|r| q.is_empty() || r.symbol.to_uppercase().contains(&q))
            .map(|r| r.symbol.clone())
            .collect();
        Page::from_items(symbols, limit, offset)
    }

    pub fn quote_for_symbol(&self, symbol: &str) -> Result<Quote, DemoDataError> {
        Ok(self.require_row(symbol)?.quote())
    }

    pub fn quotes_all(&self, limit: Option<usize>, offset: usize) -> Page<Quote> {
        Page::from_items(self.rows.iter().map(DemoRow::quote).collect(), limit, offset)
    }

    pub fn fundamentals_for_symbol(&self, symbol: &str) -> Result<FundamentalsSnapshot, DemoDataError> {
        Ok(self.require_row(symbol)?.fundamentals())
    }

    pub fn technicals_for_symbol(&self, symbol: &str) -> Result<IndicatorSet, DemoDataError> {
        Ok(self.require_row(symbol)?.technicals())
    }

    pub fn summary_for_symbol(&self, symbol: &str) -> Result<Summary, DemoDataError> {
        Ok(self.require_row(symbol)?.summary())
    }
}

fn base_symbol(symbol: &str) -> &str {
    symbol.split('.').next().unwrap_or(symbol)
}

fn number<T: std::str::FromStr>(
    columns: &HashMap<String, usize>,
    record: &csv::StringRecord,
    name: &str,
    line: usize,
) -> Option<T> {
    let raw = columns.get(name).and_then(|&i| record.get(i))?;
    match parse_cell(raw) {
        Parsed::Unparsable => {
            tracing::debug!("row {}: unparsable {} value {:?}", line + 1, name, raw);
            None
        }
        parsed => parsed.value(),
    }
}

/// Loads the dataset on first use and keeps it for the life of the process.
///
/// A failed load is not remembered, so a file that appears later is picked up.
pub struct DemoStore {
    path: PathBuf,
    loaded: Mutex<Option<Arc<DemoDataset>>>,
}

impl DemoStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dataset(&self) -> Result<Arc<DemoDataset>, DemoDataError> {
        let mut loaded = self.loaded.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(dataset) = loaded.as_ref() {
            return Ok(dataset.clone());
        }
        let dataset = Arc::new(DemoDataset::load(&self.path)?);
        *loaded = Some(dataset.clone());
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
symbol , price,previous_close,change,change_pct,market_cap,pe,roe,debt_to_equity,eps,rsi,macd_hist,sma_50,sma_200,bb_ma,bb_upper,bb_lower,recommendation,recommendation_score,currency,updated_at
RELIANCE.NS, 2950.5 ,2900,50.5,1.741,\"19,960,000,000,000\",28.1,0.14,0.4,105.2,55.2,3.1,2900,2700,2920,3000,2840,Strong Buy,5,,2024-06-01
TCS.NS,4100,4000,100,2.5,n/a,31,0.45,0.1,120,72,-1.2,4000,3800,4050,4200,3900,Buy,3,INR,2024-06-01
INFY.BO,,,,,,,,,,,,,,,,,,,USD,
AAPL,190,188,2,1.064,2900000000000,29.5,1.47,1.45,6.4,40,0.5,185,180,188,195,181,Mystery,,USD,2024-06-02
";

    fn dataset() -> DemoDataset {
        DemoDataset::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn test_parses_rows_with_trimmed_headers() {
        let ds = dataset();
        assert_eq!(ds.rows().len(), 4);

        let reliance = &ds.rows()[0];
        assert_eq!(reliance.symbol, "RELIANCE.NS");
        assert_eq!(reliance.price, Some(2950.5));
        assert_eq!(reliance.market_cap, Some(19_960_000_000_000));
        assert_eq!(reliance.currency, None);

        // unparsable market cap becomes absent
        assert_eq!(ds.rows()[1].market_cap, None);
        assert_eq!(ds.rows()[2].price, None);
    }

    #[test]
    fn test_missing_symbol_column() {
        let err = DemoDataset::from_reader("ticker,price\nA,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DemoDataError::MissingColumn(ref c) if c == "symbol"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_find_row_exact_then_loose() {
        let ds = dataset();
        assert_eq!(ds.find_row("tcs.ns").map(|r| r.symbol.as_str()), Some("TCS.NS"));
        assert_eq!(ds.find_row("RELIANCE").map(|r| r.symbol.as_str()), Some("RELIANCE.NS"));
        assert_eq!(ds.find_row("INFY.NS").map(|r| r.symbol.as_str()), Some("INFY.BO"));
        assert!(ds.find_row("MSFT").is_none());
    }

    #[test]
    fn test_list_symbols_filter_and_paging() {
        let ds = dataset();

        let page = ds.list_symbols("", Some(2), 1);
        assert_eq!(page.total, 4);
        assert_eq!(page.data, vec!["TCS.NS", "INFY.BO"]);

        let ns = ds.list_symbols(" .ns", None, 0);
        assert_eq!(ns.total, 2);
        assert_eq!(ns.limit, 2);
        assert_eq!(ns.data, vec!["RELIANCE.NS", "TCS.NS"]);
    }

    #[test]
    fn test_quote_defaults() {
        let ds = dataset();
        let q = ds.quote_for_symbol("RELIANCE").unwrap();
        assert_eq!(q.currency.as_deref(), Some("INR"));
        assert_eq!(q.ts, Some(serde_json::Value::String("2024-06-01".to_string())));
        assert_eq!(q.status, QuoteStatus::Ok);
        assert_eq!(q.change_pct, Some(1.741));

        let infy = ds.quote_for_symbol("INFY.BO").unwrap();
        assert_eq!(infy.currency.as_deref(), Some("USD"));
        assert_eq!(infy.ts, None);
        assert_eq!(infy.price, None);
    }

    #[test]
    fn test_quotes_all_pages_every_row() {
        let page = dataset().quotes_all(Some(200), 0);
        assert_eq!(page.total, 4);
        assert_eq!(page.data.len(), 4);
        assert_eq!(page.data[3].symbol, "AAPL");
    }

    #[test]
    fn test_unknown_symbol() {
        let err = dataset().summary_for_symbol("NOPE").unwrap_err();
        assert_eq!(err.to_string(), "Symbol not found in static dataset: NOPE");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_fundamentals_and_technicals() {
        let ds = dataset();
        let f = ds.fundamentals_for_symbol("TCS").unwrap();
        assert_eq!(f.trailing_pe, Some(31.0));
        assert_eq!(f.market_cap, None);
        assert_eq!(f.eps_trailing_twelve_months, Some(120.0));

        let t = ds.technicals_for_symbol("TCS").unwrap();
        assert!(t.rsi.series.is_empty());
        assert_eq!(t.rsi.latest, Some(72.0));
        assert_eq!(t.macd.hist_latest, Some(-1.2));
        assert_eq!(t.moving_averages.sma50_latest, Some(4000.0));
        assert_eq!(t.bollinger_bands.lower_latest, Some(3900.0));
    }

    #[test]
    fn test_summary_uses_stored_recommendation() {
        let ds = dataset();

        let reliance = ds.summary_for_symbol("RELIANCE.NS").unwrap();
        assert_eq!(reliance.score, 5);
        assert_eq!(reliance.signal, Signal::StrongBuy);
        assert_eq!(reliance.reasons.len(), 5);
        assert_eq!(reliance.reasons.last().map(String::as_str), Some(REASON_LOW_DEBT));

        let tcs = ds.summary_for_symbol("TCS.NS").unwrap();
        assert_eq!(tcs.signal, Signal::Buy);
        assert_eq!(
            tcs.reasons,
            vec!["Reasonable P/E valuation", "Healthy ROE (>12%)", REASON_LOW_DEBT]
        );

        // unknown label and missing score fall back
        let aapl = ds.summary_for_symbol("AAPL").unwrap();
        assert_eq!(aapl.score, 0);
        assert_eq!(aapl.signal, Signal::Hold);
        assert_eq!(aapl.reasons.len(), 3);

        let empty = ds.summary_for_symbol("INFY").unwrap();
        assert!(empty.reasons.is_empty());
        assert_eq!(empty.signal, DEFAULT_RECOMMENDATION);
    }

    #[test]
    fn test_store_loads_lazily_and_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stock_static.csv");

        let store = DemoStore::new(path.clone());
        let err = store.dataset().unwrap_err();
        assert!(matches!(err, DemoDataError::DatasetMissing(_)));
        assert!(!err.is_client_error());

        std::fs::write(&path, SAMPLE).unwrap();
        let first = store.dataset().unwrap();
        let second = store.dataset().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.rows().len(), 4);
    }
}
