//! Per-symbol analysis routes: technicals, fundamentals, summary and batch quotes.

use analysis_core::{
    normalize_symbol, FundamentalsSnapshot, IndicatorSet, Interval, Period, Quote, Summary,
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, Backend};

#[derive(Debug, Deserialize)]
pub struct SymbolQuery {
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TechnicalsQuery {
    pub symbol: Option<String>,
    pub period: Option<String>,
    pub interval: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuotesQuery {
    /// Comma-separated list.
    pub symbols: Option<String>,
    pub chunk_size: Option<String>,
    pub delay_ms: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuotesResponse {
    pub count: usize,
    pub data: Vec<Quote>,
}

pub fn market_routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/summary", get(get_summary))
        .route("/api/technicals", get(get_technicals))
        .route("/api/fundamentals", get(get_fundamentals))
        .route("/api/quotes", get(get_quotes))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn require_symbol(symbol: Option<String>) -> Result<String, AppError> {
    let symbol = symbol.unwrap_or_default().trim().to_string();
    if symbol.is_empty() {
        return Err(AppError::bad_request("symbol is required"));
    }
    Ok(symbol)
}

async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<Summary>, AppError> {
    const CONTEXT: &str = "Failed to create summary";
    let symbol = require_symbol(query.symbol)?;

    let summary = match state.backend.as_ref() {
        Backend::Demo(store) => store
            .dataset()
            .and_then(|ds| ds.summary_for_symbol(&symbol))
            .map_err(|e| AppError::from_demo(CONTEXT, e))?,
        Backend::Live(live) => live
            .service
            .summary(&symbol)
            .await
            .map_err(|e| AppError::from_analysis(CONTEXT, e))?,
    };

    Ok(Json(summary))
}

async fn get_technicals(
    State(state): State<AppState>,
    Query(query): Query<TechnicalsQuery>,
) -> Result<Json<IndicatorSet>, AppError> {
    const CONTEXT: &str = "Failed to fetch technicals";
    let symbol = require_symbol(query.symbol)?;

    let period = query
        .period
        .as_deref()
        .map(str::parse::<Period>)
        .transpose()
        .map_err(|e| AppError::from_analysis(CONTEXT, e))?
        .unwrap_or_default();
    let interval = query
        .interval
        .as_deref()
        .map(str::parse::<Interval>)
        .transpose()
        .map_err(|e| AppError::from_analysis(CONTEXT, e))?
        .unwrap_or_default();

    let technicals = match state.backend.as_ref() {
        // the snapshot holds one set of latest values, whatever the window
        Backend::Demo(store) => store
            .dataset()
            .and_then(|ds| ds.technicals_for_symbol(&symbol))
            .map_err(|e| AppError::from_demo(CONTEXT, e))?,
        Backend::Live(live) => live
            .service
            .technicals(&symbol, period, interval)
            .await
            .map_err(|e| AppError::from_analysis(CONTEXT, e))?,
    };

    Ok(Json(technicals))
}

async fn get_fundamentals(
    State(state): State<AppState>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<FundamentalsSnapshot>, AppError> {
    const CONTEXT: &str = "Failed to fetch fundamentals";
    let symbol = require_symbol(query.symbol)?;

    let fundamentals = match state.backend.as_ref() {
        Backend::Demo(store) => store
            .dataset()
            .and_then(|ds| ds.fundamentals_for_symbol(&symbol))
            .map_err(|e| AppError::from_demo(CONTEXT, e))?,
        Backend::Live(live) => live
            .service
            .fundamentals(&symbol)
            .await
            .map_err(|e| AppError::from_analysis(CONTEXT, e))?,
    };

    Ok(Json(fundamentals))
}

async fn get_quotes(
    State(state): State<AppState>,
    Query(query): Query<QuotesQuery>,
) -> Result<Json<QuotesResponse>, AppError> {
    let symbols: Vec<String> = query
        .symbols
        .unwrap_or_default()
        .split(',')
        .map(normalize_symbol)
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        return Err(AppError::bad_request("symbols is required"));
    }

    let chunk_size = query
        .chunk_size
        .and_then(|v| v.trim().parse().ok())
        .filter(|&n: &usize| n > 0)
        .unwrap_or(state.quote_chunk_size);
    let delay_ms = query
        .delay_ms
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(state.quote_delay_ms);

    let data: Vec<Quote> = match state.backend.as_ref() {
        Backend::Demo(store) => {
            let ds = store
                .dataset()
                .map_err(|e| AppError::from_demo("Failed to fetch quotes", e))?;
            symbols
                .iter()
                .map(|s| {
                    ds.quote_for_symbol(s).unwrap_or_else(|_| Quote {
                        ts: None,
                        ..Quote::empty(s.as_str(), 0)
                    })
                })
                .collect()
        }
        Backend::Live(live) => live.service.quotes_batch(&symbols, chunk_size, delay_ms).await,
    };

    Ok(Json(QuotesResponse {
        count: data.len(),
        data,
    }))
}
