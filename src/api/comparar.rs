use crate::error::AppResult;
use crate::services::Comparison;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

async fn compare(State(state): State<Arc<AppState>>) -> AppResult<Json<Comparison>> {
    let comparison = state.comparator.compare().await?;
    Ok(Json(comparison))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/comparar", get(compare))
}
