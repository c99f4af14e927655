use crate::api::{bad_request, page_limit, page_offset};
use crate::error::{AppError, AppResult};
use crate::models::{EtfQuote, FondoListQuery, FundKind, Market};
use crate::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ListParams {
    tipo: Option<String>,
    mercado: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TopParams {
    limit: Option<i64>,
}

async fn list_fondos(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> AppResult<Json<Vec<EtfQuote>>> {
    let Query(params) = params.map_err(bad_request)?;

    // Filters are matched against the canonical upper-case spelling
    let kind = params
        .tipo
        .as_deref()
        .map(FundKind::from_str)
        .transpose()
        .map_err(AppError::Validation)?;
    let market = params
        .mercado
        .as_deref()
        .map(Market::from_str)
        .transpose()
        .map_err(AppError::Validation)?;

    let query = FondoListQuery {
        kind: kind.map(|k| k.as_str().to_string()),
        market: market.map(|m| m.as_str().to_string()),
        limit: page_limit(params.limit, 20, 100)?,
        offset: page_offset(params.offset)?,
    };
    let rows = state.fondos.list(&query).await?;
    Ok(Json(rows))
}

async fn search_fondos(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> AppResult<Json<Vec<EtfQuote>>> {
    let Query(params) = params.map_err(bad_request)?;

    let term = params.q.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Err(AppError::Validation("q must not be empty".to_string()));
    }

    let rows = state
        .fondos
        .search(term, page_limit(params.limit, 10, 50)?)
        .await?;
    Ok(Json(rows))
}

async fn top_fondos(
    State(state): State<Arc<AppState>>,
    params: Result<Query<TopParams>, QueryRejection>,
) -> AppResult<Json<Vec<EtfQuote>>> {
    let Query(params) = params.map_err(bad_request)?;
    let rows = state
        .fondos
        .top_performers(page_limit(params.limit, 10, 50)?)
        .await?;
    Ok(Json(rows))
}

async fn get_fondo(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> AppResult<Json<EtfQuote>> {
    state
        .fondos
        .find_latest_by_ticker(&ticker)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Fund {} not found", ticker.to_uppercase())))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/fondos", get(list_fondos))
        .route("/fondos/buscar", get(search_fondos))
        .route("/fondos/top", get(top_fondos))
        .route("/fondos/{ticker}", get(get_fondo))
}
