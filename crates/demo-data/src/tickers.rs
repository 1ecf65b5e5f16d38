use std::collections::HashSet;
use std::path::Path;

use crate::error::DemoDataError;

/// Header names accepted for the ticker column, in priority order.
pub const TICKER_COLUMNS: &[&str] = &["symbol", "ticker", "Ticker", "SYMBOL"];

/// Upper-cased, de-duplicated tickers in file order. Exchange suffixes are kept.
pub fn load_supported_tickers(path: &Path) -> Result<Vec<String>, DemoDataError> {
    if !path.exists() {
        return Err(DemoDataError::TickersMissing(path.to_path_buf()));
    }
    let tickers = read_tickers(std::fs::File::open(path)?)?;
    tracing::info!("Loaded {} supported tickers from {}", tickers.len(), path.display());
    Ok(tickers)
}

pub fn read_tickers<R: std::io::Read>(reader: R) -> Result<Vec<String>, DemoDataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let column = TICKER_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h == *name))
        .ok_or(DemoDataError::NoTickerColumn(TICKER_COLUMNS))?;

    let mut seen = HashSet::new();
    let mut tickers = Vec::new();
    for record in reader.records() {
        let record = record?;
        let ticker = record.get(column).unwrap_or("").trim().to_uppercase();
        if !ticker.is_empty() && seen.insert(ticker.clone()) {
            tickers.push(ticker);
        }
    }
    Ok(tickers)
}
