//! Offline market data: a static CSV snapshot of quotes, fundamentals and
//! pre-computed indicators, plus the supported-tickers list.

pub mod dataset;
pub mod error;
pub mod page;
pub mod parse;
pub mod tickers;

pub use dataset::{DemoDataset, DemoRow, DemoStore};
pub use error::DemoDataError;
pub use page::Page;
pub use tickers::load_supported_tickers;
