//! Read-only HTTP API.
//!
//! Every data route lives under `/api`; `/` and `/health` sit at the root.

pub mod cetes;
pub mod comparar;
pub mod fondos;
pub mod sofipos;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::AppState;
use axum::{extract::State, http::HeaderValue, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Build the full router with CORS and request tracing applied
pub fn app_router(state: Arc<AppState>, config: &AppConfig) -> Router {
    let api = Router::new()
        .merge(cetes::router())
        .merge(sofipos::router())
        .merge(fondos::router())
        .merge(comparar::router());

    let environment = config.environment.clone();

    Router::new()
        .route("/", get(root))
        .route(
            "/health",
            get(move |state: State<Arc<AppState>>| health(state, environment.clone())),
        )
        .nest("/api", api)
        .with_state(state)
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed: &[String]) -> CorsLayer {
    if allowed.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let origins = allowed
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({
        "nombre": "Tasas API",
        "version": env!("CARGO_PKG_VERSION"),
        "descripcion": "API para consultar rendimientos financieros en México",
        "endpoints": {
            "cetes": "/api/cetes",
            "sofipos": "/api/sofipos",
            "fondos": "/api/fondos",
            "comparar": "/api/comparar",
        },
    }))
}

async fn health(State(state): State<Arc<AppState>>, environment: String) -> Json<Value> {
    let database = match &state.database {
        Some(db) => match db.ping().await {
            Ok(()) => "up",
            Err(e) => {
                warn!("Health check could not reach the database: {}", e);
                "down"
            }
        },
        None => "not configured",
    };

    let status = if database == "down" { "degraded" } else { "ok" };
    Json(json!({
        "status": status,
        "environment": environment,
        "database": database,
    }))
}

/// Turn an extractor rejection into a 400 with the usual error body
pub(crate) fn bad_request<E: std::fmt::Display>(rejection: E) -> AppError {
    AppError::Validation(rejection.to_string())
}

/// Resolve a requested page size against its default and ceiling
pub(crate) fn page_limit(requested: Option<i64>, default: i64, max: i64) -> AppResult<i64> {
    let limit = requested.unwrap_or(default);
    if !(1..=max).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            max
        )));
    }
    Ok(limit)
}

pub(crate) fn page_offset(requested: Option<i64>) -> AppResult<i64> {
    let offset = requested.unwrap_or(0);
    if offset < 0 {
        return Err(AppError::Validation("offset must be 0 or greater".to_string()));
    }
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_limit() {
        assert_eq!(page_limit(None, 20, 100).unwrap(), 20);
        assert_eq!(page_limit(Some(100), 20, 100).unwrap(), 100);
        assert!(page_limit(Some(101), 20, 100).is_err());
        assert!(page_limit(Some(0), 20, 100).is_err());
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(None).unwrap(), 0);
        assert!(page_offset(Some(-1)).is_err());
    }
}
