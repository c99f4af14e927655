//! One-shot data loader.
//!
//! Commands:
//! - `cetes`: CETES auction rates from Banxico
//! - `sofipos`: SOFIPO yields (scraped, or the curated snapshot)
//! - `etfs`: ETF quotes within today's Alpha Vantage budget
//! - `all`: every source in turn
//!
//! Exit status is 0 on completion (running out of quote budget included),
//! 2 on a configuration problem and 1 when the database fails.

use clap::{Parser, Subcommand};
use sqlx::PgPool;
use std::process::ExitCode;
use std::sync::Arc;
use tasas_backend::acquirers::{CetesAcquirer, EtfAcquirer, SofipoAcquirer, DEFAULT_DAYS_BACK};
use tasas_backend::config::SourcesConfig;
use tasas_backend::database::{create_pool, run_migrations};
use tasas_backend::logging::init_tracing;
use tasas_backend::repositories::{CetesRepository, FondoRepository, SofipoRepository};
use tasas_backend::{AppConfig, CollectorError, CollectorResult};
use tracing::{error, info};

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIG: u8 = 2;

const EXIT_STATUS_HELP: &str = "Exit status:
  0  every requested source finished (running out of ETF quote budget included)
  1  the database could not be reached or a store operation failed
  2  configuration error (invalid environment or a missing API key)";

#[derive(Parser)]
#[command(
    name = "collect",
    about = "Load CETES, SOFIPO and ETF yields into the database",
    after_help = EXIT_STATUS_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch CETES auction rates from Banxico SIE.
    Cetes {
        /// Days to look back.
        #[arg(long, default_value_t = DEFAULT_DAYS_BACK)]
        days: u32,
    },
    /// Scrape SOFIPO yields, falling back to the curated snapshot.
    Sofipos,
    /// Quote the ETF watchlist within today's API budget.
    Etfs {
        /// Quote at most this many tickers.
        #[arg(long)]
        max: Option<usize>,
    },
    /// Run every acquirer in turn.
    All {
        /// Days to look back for CETES.
        #[arg(long, default_value_t = DEFAULT_DAYS_BACK)]
        days: u32,
        /// Quote at most this many tickers.
        #[arg(long)]
        max: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    dotenv::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    init_tracing(&config);

    let pool = match create_pool(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to create database pool: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    if let Err(e) = run_migrations(&pool, None).await {
        error!("Database migration failed: {}", e);
        pool.close().await;
        return ExitCode::from(EXIT_FAILURE);
    }

    let results = match cli.command {
        Commands::Cetes { days } => vec![("cetes", collect_cetes(&config.sources, &pool, days).await)],
        Commands::Sofipos => vec![("sofipos", collect_sofipos(&config.sources, &pool).await)],
        Commands::Etfs { max } => vec![("etfs", collect_etfs(&config.sources, &pool, max).await)],
        Commands::All { days, max } => vec![
            ("cetes", collect_cetes(&config.sources, &pool, days).await),
            ("sofipos", collect_sofipos(&config.sources, &pool).await),
            ("etfs", collect_etfs(&config.sources, &pool, max).await),
        ],
    };

    pool.close().await;
    exit_code(&results)
}

async fn collect_cetes(sources: &SourcesConfig, pool: &PgPool, days: u32) -> CollectorResult<usize> {
    let store = Arc::new(CetesRepository::new(pool.clone()));
    CetesAcquirer::new(sources, store)?.collect(days).await
}

async fn collect_sofipos(sources: &SourcesConfig, pool: &PgPool) -> CollectorResult<usize> {
    let store = Arc::new(SofipoRepository::new(pool.clone()));
    SofipoAcquirer::new(sources, store)?.collect().await
}

async fn collect_etfs(sources: &SourcesConfig, pool: &PgPool, max: Option<usize>) -> CollectorResult<usize> {
    let store = Arc::new(FondoRepository::new(pool.clone()));
    EtfAcquirer::new(sources, store)?.collect(max).await
}

/// Configuration problems outrank database failures; anything else succeeded
fn exit_code(results: &[(&str, CollectorResult<usize>)]) -> ExitCode {
    let mut code = 0;
    for (name, result) in results {
        match result {
            Ok(rows) => info!("{}: {} new rows", name, rows),
            Err(e) if e.is_quota_exhausted() => info!("{}: stopped early: {}", name, e),
            Err(e @ CollectorError::Config(_)) => {
                error!("{}: {}", name, e);
                code = EXIT_CONFIG;
            }
            Err(e) => {
                error!("{}: {}", name, e);
                if code == 0 {
                    code = EXIT_FAILURE;
                }
            }
        }
    }
    ExitCode::from(code)
}
