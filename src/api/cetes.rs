use crate::api::{bad_request, page_limit};
use crate::error::{AppError, AppResult};
use crate::models::{CetesAuction, CetesHistoryQuery, Maturity};
use crate::AppState;
use axum::{
    extract::{rejection::PathRejection, rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

/// Rows returned when listing a single maturity
const RECENT_LIMIT: i64 = 10;
const HISTORY_DEFAULT_LIMIT: i64 = 50;
const HISTORY_MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
struct ListParams {
    plazo: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    plazo: Option<i32>,
    fecha_inicio: Option<NaiveDate>,
    fecha_fin: Option<NaiveDate>,
    limit: Option<i64>,
}

fn maturity(plazo: i32) -> AppResult<Maturity> {
    Maturity::from_days(plazo)
        .ok_or_else(|| AppError::Validation("plazo must be 28, 91, 182 or 364".to_string()))
}

async fn list_cetes(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> AppResult<Json<Vec<CetesAuction>>> {
    let Query(params) = params.map_err(bad_request)?;

    let rows = match params.plazo {
        Some(plazo) => {
            let maturity = maturity(plazo)?;
            state.cetes.recent_for_maturity(maturity.days(), RECENT_LIMIT).await?
        }
        None => state.cetes.latest_per_maturity().await?,
    };
    Ok(Json(rows))
}

async fn current_rates(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<CetesAuction>>> {
    let rows = state.cetes.latest_per_maturity().await?;
    Ok(Json(rows))
}

async fn history(
    State(state): State<Arc<AppState>>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> AppResult<Json<Vec<CetesAuction>>> {
    let Query(params) = params.map_err(bad_request)?;

    let plazo = params
        .plazo
        .ok_or_else(|| AppError::Validation("plazo is required".to_string()))?;
    let maturity = maturity(plazo)?;

    if let (Some(from), Some(to)) = (params.fecha_inicio, params.fecha_fin) {
        if from > to {
            return Err(AppError::Validation(
                "fecha_inicio must not be after fecha_fin".to_string(),
            ));
        }
    }

    let query = CetesHistoryQuery {
        maturity_days: maturity.days(),
        from: params.fecha_inicio,
        to: params.fecha_fin,
        limit: page_limit(params.limit, HISTORY_DEFAULT_LIMIT, HISTORY_MAX_LIMIT)?,
    };
    let rows = state.cetes.history(&query).await?;
    Ok(Json(rows))
}

async fn rate_for_maturity(
    State(state): State<Arc<AppState>>,
    plazo: Result<Path<i32>, PathRejection>,
) -> AppResult<Json<CetesAuction>> {
    let Path(plazo) = plazo.map_err(bad_request)?;
    let maturity = maturity(plazo)?;

    state
        .cetes
        .latest_for_maturity(maturity.days())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No data for CETES {}", maturity)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cetes", get(list_cetes))
        .route("/cetes/actuales", get(current_rates))
        .route("/cetes/historico", get(history))
        .route("/cetes/{plazo}", get(rate_for_maturity))
}
