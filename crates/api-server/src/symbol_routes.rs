//! Listing routes: ticker search, paged quotes for the whole universe, and the
//! raw snapshot download.

use analysis_core::Quote;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use demo_data::Page;
use serde::Deserialize;

use crate::{AppError, AppState, Backend};

pub const DEFAULT_PAGE_LIMIT: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub q: Option<String>,
    /// A count or `all`.
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl PageQuery {
    /// `None` means no limit. Unparsable values fall back to the default.
    pub fn limit(&self) -> Option<usize> {
        match self.limit.as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("all") => None,
            Some(v) => Some(v.parse().unwrap_or(DEFAULT_PAGE_LIMIT)),
            None => Some(DEFAULT_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
            .as_deref()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }
}

pub fn symbol_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tickers", get(list_tickers))
        .route("/api/quotes_all", get(quotes_all))
        .route("/api/csv", get(download_csv))
}

async fn list_tickers(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<String>>, AppError> {
    let q = query.q.as_deref().unwrap_or("").trim();

    let page = match state.backend.as_ref() {
        Backend::Demo(store) => store
            .dataset()
            .map_err(|e| AppError::from_demo("Failed to list tickers", e))?
            .list_symbols(q, query.limit(), query.offset()),
        Backend::Live(live) => {
            let needle = q.to_uppercase();
            let matches: Vec<String> = live
                .tickers
                .iter()
                .filter(|t| t.contains(&needle))
                .cloned()
                .collect();
            Page::from_items(matches, query.limit(), query.offset())
        }
    };

    Ok(Json(page))
}

async fn quotes_all(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Quote>>, AppError> {
    let page = match state.backend.as_ref() {
        Backend::Demo(store) => store
            .dataset()
            .map_err(|e| AppError::from_demo("Failed to fetch quotes", e))?
            .quotes_all(query.limit(), query.offset()),
        Backend::Live(live) => {
            let symbols = Page::from_items(live.tickers.clone(), query.limit(), query.offset());
            let quotes = live
                .service
                .quotes_batch(&symbols.data, state.quote_chunk_size, state.quote_delay_ms)
                .await;
            Page {
                total: symbols.total,
                limit: symbols.limit,
                offset: symbols.offset,
                data: quotes,
            }
        }
    };

    Ok(Json(page))
}

async fn download_csv(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let path = &state.demo_csv_path;
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("CSV download requested but {} is missing", path.display());
            return Err(AppError::not_found());
        }
        Err(e) => {
            return Err(AppError::with_status(StatusCode::INTERNAL_SERVER_ERROR, e));
        }
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("stock_static_100.csv");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    ))
}
