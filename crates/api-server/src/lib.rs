use analysis_core::AnalysisError;
use analysis_orchestrator::{MarketDataService, ResolverConfig, TtlCache};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use demo_data::{DemoDataError, DemoStore};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use yahoo_client::YahooClient;

pub mod config;
mod market_routes;
mod security_headers;
mod symbol_routes;


pub use config::{DataMode, ServerConfig};

/// Live market data plus the universe of tickers the UI may list.
pub struct LiveBackend {
    pub service: MarketDataService,
    pub tickers: Vec<String>,
}

pub enum Backend {
    Demo(DemoStore),
    Live(LiveBackend),
}

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<Backend>,
    pub demo_csv_path: PathBuf,
    pub quote_chunk_size: usize,
    pub quote_delay_ms: u64,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let backend = match config.data_mode {
            DataMode::Demo => {
                tracing::info!("Serving demo data from {}", config.demo_csv_path.display());
                Backend::Demo(DemoStore::new(config.demo_csv_path.clone()))
            }
            DataMode::Live => {
                let provider = Arc::new(YahooClient::new(config.yahoo_rate_limit)?);
                let cache = Arc::new(TtlCache::new(config.cache_ttl_secs, config.cache_max_size));
                let tickers = match demo_data::load_supported_tickers(&config.tickers_csv_path) {
                    Ok(tickers) => tickers,
                    Err(e) => {
                        tracing::warn!("Supported tickers unavailable: {}", e);
                        Vec::new()
                    }
                };
                tracing::info!(
                    "Serving live data ({} tickers, cache ttl {}s, max {} entries)",
                    tickers.len(),
                    config.cache_ttl_secs,
                    config.cache_max_size
                );
                Backend::Live(LiveBackend {
                    service: MarketDataService::new(provider, cache, ResolverConfig::default()),
                    tickers,
                })
            }
        };

        Ok(Self {
            backend: Arc::new(backend),
            demo_csv_path: config.demo_csv_path.clone(),
            quote_chunk_size: config.quote_chunk_size,
            quote_delay_ms: config.quote_delay_ms,
        })
    }
}

/// Error body is always `{"error": "<message>"}`.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }

    pub fn bad_request(message: impl std::fmt::Display) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!("{}", message))
    }

    pub fn not_found() -> Self {
        Self::with_status(StatusCode::NOT_FOUND, anyhow::anyhow!("Not found"))
    }

    /// Caller mistakes and unknown symbols surface their message; anything else
    /// is logged and replaced by `context`.
    pub fn from_analysis(context: &str, e: AnalysisError) -> Self {
        if matches!(e, AnalysisError::InvalidRequest(_)) || e.is_not_found() {
            return Self::bad_request(e);
        }
        tracing::error!("{}: {}", context, e);
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!("{}", context))
    }

    pub fn from_demo(context: &str, e: DemoDataError) -> Self {
        if e.is_client_error() {
            return Self::bad_request(e);
        }
        tracing::error!("{}: {}", context, e);
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!("{}", context))
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        }
        let body = serde_json::json!({ "error": self.error.to_string() });
        (self.status, Json(body)).into_response()
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(market_routes::market_routes())
        .merge(symbol_routes::symbol_routes())
        .fallback(|| async { AppError::not_found() })
        .layer(axum::middleware::from_fn(security_headers::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    tracing::info!("Configuration loaded ({:?} mode)", config.data_mode);

    let state = AppState::from_config(&config)?;
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
