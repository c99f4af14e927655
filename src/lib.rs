//! Tasas Backend Library
//!
//! Yield aggregator for CETES, SOFIPOs and ETFs. The acquirers feed a
//! Postgres store; the HTTP API and the comparator read from it.

pub mod acquirers;
pub mod api;
pub mod config;
pub mod database;
pub mod decimal;
pub mod error;
pub mod logging;
pub mod models;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult, CollectorError, CollectorResult};

use database::Database;
use repositories::*;
use services::Comparator;
use std::sync::Arc;

/// Application state shared by every request handler
pub struct AppState {
    /// Absent when the stores are not Postgres-backed
    pub database: Option<Database>,
    pub cetes: Arc<dyn CetesStore>,
    pub sofipos: Arc<dyn SofipoStore>,
    pub fondos: Arc<dyn FondoStore>,
    pub comparator: Arc<Comparator>,
}

impl AppState {
    /// Create a new AppState backed by the Postgres repositories
    pub fn new(pool: sqlx::PgPool) -> Self {
        let database = Database::new(pool.clone());
        let mut state = Self::from_stores(
            Arc::new(CetesRepository::new(pool.clone())),
            Arc::new(SofipoRepository::new(pool.clone())),
            Arc::new(FondoRepository::new(pool)),
        );
        state.database = Some(database);
        state
    }

    /// Build state over arbitrary store implementations
    pub fn from_stores(
        cetes: Arc<dyn CetesStore>,
        sofipos: Arc<dyn SofipoStore>,
        fondos: Arc<dyn FondoStore>,
    ) -> Self {
        let comparator = Arc::new(Comparator::new(cetes.clone(), sofipos.clone(), fondos.clone()));
        Self {
            database: None,
            cetes,
            sofipos,
            fondos,
            comparator,
        }
    }
}
