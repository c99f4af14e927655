//! Tasas Backend Service
//!
//! Main entry point for the yield API server.
//! This service provides:
//! - HTTP JSON API over CETES, SOFIPO and ETF data
//! - A cross-category comparison endpoint
//!
//! Data is loaded separately by the `collect` binary.

use std::net::SocketAddr;
use std::sync::Arc;
use tasas_backend::api::app_router;
use tasas_backend::database::{create_pool, run_migrations};
use tasas_backend::logging::init_tracing;
use tasas_backend::{AppConfig, AppError, AppResult, AppState};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    init_tracing(&config);

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           Tasas Backend Service Starting                  ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("HTTP port: {}", config.http_port);

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    info!("Running database migrations...");
    run_migrations(&pool, None).await.map_err(|e| {
        error!("Database migration failed: {}", e);
        AppError::Database(e)
    })?;

    info!("Database migrations completed successfully");

    // =========================================================================
    // HTTP SERVER
    // =========================================================================
    let app_state = Arc::new(AppState::new(pool));
    let database = app_state.database.clone();
    let app = app_router(app_state, &config);
    info!("✓ Router initialized");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Message(format!("Failed to bind HTTP server on {}: {}", addr, e)))?;

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           Tasas Backend Service Ready!                    ║");
    info!("╠══════════════════════════════════════════════════════════╣");
    info!("║  HTTP API:     0.0.0.0:{}                              ║", config.http_port);
    info!("║  Environment:  {}                                    ║", config.environment);
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received, shutting down gracefully...");
        })
        .await;

    if let Some(database) = database {
        database.close().await;
    }

    served.map_err(|e| AppError::Message(format!("HTTP server error: {}", e)))?;
    info!("Tasas backend service shutdown complete");
    Ok(())
}
