use crate::api::{bad_request, page_limit, page_offset};
use crate::error::{AppError, AppResult};
use crate::models::{SofipoListQuery, SofipoOrder, SofipoSnapshot};
use crate::AppState;
use axum::{
    extract::{rejection::PathRejection, rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<i64>,
    offset: Option<i64>,
    ordenar_por: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TopParams {
    limit: Option<i64>,
}

async fn list_sofipos(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> AppResult<Json<Vec<SofipoSnapshot>>> {
    let Query(params) = params.map_err(bad_request)?;

    let order_by = match params.ordenar_por.as_deref() {
        Some(order) => SofipoOrder::from_str(order).map_err(AppError::Validation)?,
        None => SofipoOrder::default(),
    };

    let query = SofipoListQuery {
        limit: page_limit(params.limit, 20, 100)?,
        offset: page_offset(params.offset)?,
        order_by,
    };
    let rows = state.sofipos.list(&query).await?;
    Ok(Json(rows))
}

async fn top_sofipos(
    State(state): State<Arc<AppState>>,
    params: Result<Query<TopParams>, QueryRejection>,
) -> AppResult<Json<Vec<SofipoSnapshot>>> {
    let Query(params) = params.map_err(bad_request)?;
    let rows = state.sofipos.top(page_limit(params.limit, 10, 50)?).await?;
    Ok(Json(rows))
}

async fn get_sofipo(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<SofipoSnapshot>> {
    let Path(id) = id.map_err(bad_request)?;

    state
        .sofipos
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("SOFIPO {} not found", id)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sofipos", get(list_sofipos))
        .route("/sofipos/top", get(top_sofipos))
        .route("/sofipos/{id}", get(get_sofipo))
}
