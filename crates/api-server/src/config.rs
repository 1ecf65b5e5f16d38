use analysis_orchestrator::{DEFAULT_CHUNK_SIZE, DEFAULT_DELAY_MS, DEFAULT_MAX_SIZE, DEFAULT_TTL_SECS};
use anyhow::{bail, Context, Result};
use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

/// Where market data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    /// Static CSV snapshot, no network access.
    Demo,
    /// Upstream quote provider with symbol resolution and caching.
    Live,
}

impl FromStr for DataMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(DataMode::Demo),
            "live" => Ok(DataMode::Live),
            other => bail!("unknown data mode '{}', expected 'demo' or 'live'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_mode: DataMode,
    pub demo_csv_path: PathBuf,
    pub tickers_csv_path: PathBuf,

    // Resolver cache
    pub cache_ttl_secs: i64,
    pub cache_max_size: usize,

    // Batch quotes
    pub quote_chunk_size: usize,
    pub quote_delay_ms: u64,

    /// Upstream requests per minute.
    pub yahoo_rate_limit: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            bind_addr: parse_var(&get, "BIND_ADDR", SocketAddr::from((Ipv4Addr::LOCALHOST, 5000)))?,
            data_mode: parse_var(&get, "DATA_MODE", DataMode::Demo)?,
            demo_csv_path: get("DEMO_CSV_PATH")
                .unwrap_or_else(|| "data/stock_static_100.csv".to_string())
                .into(),
            tickers_csv_path: get("TICKERS_CSV_PATH")
                .unwrap_or_else(|| "data/yfinance_supported_tickers.csv".to_string())
                .into(),
            cache_ttl_secs: parse_var(&get, "CACHE_TTL_SECS", DEFAULT_TTL_SECS)?,
            cache_max_size: parse_var(&get, "CACHE_MAX_SIZE", DEFAULT_MAX_SIZE)?,
            quote_chunk_size: parse_var(&get, "QUOTE_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            quote_delay_ms: parse_var(&get, "QUOTE_DELAY_MS", DEFAULT_DELAY_MS)?,
            yahoo_rate_limit: parse_var(&get, "YAHOO_RATE_LIMIT", yahoo_client::DEFAULT_RATE_LIMIT)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.cache_ttl_secs < 0 {
            bail!("CACHE_TTL_SECS must not be negative");
        }
        if self.quote_chunk_size == 0 {
            bail!("QUOTE_CHUNK_SIZE must be at least 1");
        }
        if self.yahoo_rate_limit == 0 {
            bail!("YAHOO_RATE_LIMIT must be at least 1");
        }
        Ok(())
    }
}

/// Unset keys yield `default`; set but unparsable keys are an error.
fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    raw.trim()
        .parse()
        .map_err(|e: T::Err| anyhow::anyhow!("{}", e))
        .with_context(|| format!("invalid {} value '{}'", key, raw))
}
