use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemoDataError {
    #[error("Static CSV not found at: {0}")]
    DatasetMissing(PathBuf),

    #[error("Tickers CSV not found at: {0}")]
    TickersMissing(PathBuf),

    #[error("CSV must contain a '{0}' column")]
    MissingColumn(String),

    #[error("No ticker column found in CSV. Expected one of {0:?}")]
    NoTickerColumn(&'static [&'static str]),

    #[error("Symbol not found in static dataset: {0}")]
    SymbolNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DemoDataError {
    /// Errors caused by the caller's input or the shape of the data file,
    /// as opposed to the file being unreadable.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DemoDataError::SymbolNotFound(_)
                | DemoDataError::MissingColumn(_)
                | DemoDataError::NoTickerColumn(_)
        )
    }
}
