//! Store seams shared by the acquirers, the comparator and the HTTP layer.
//!
//! The Postgres repositories are the production implementations; anything that
//! honours the same upsert keys and orderings can stand in for them.

use crate::error::RepositoryError;
use crate::models::{
    CetesAuction, CetesHistoryQuery, EtfQuote, FondoListQuery, NewCetesAuction, NewEtfQuote,
    NewSofipoSnapshot, SofipoListQuery, SofipoSnapshot,
};
use async_trait::async_trait;

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Per-row result of a unit of work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Rows newly materialised
    pub inserted: usize,
    /// Rows that hit an existing key and changed nothing
    pub unchanged: usize,
    /// Rows rolled back on a row-level error
    pub failed: usize,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.inserted + self.unchanged + self.failed
    }
}

#[async_trait]
pub trait CetesStore: Send + Sync {
    /// Insert unless `(plazo, fecha_subasta)` exists; true when a row was written
    async fn upsert(&self, auction: &NewCetesAuction) -> RepoResult<bool>;

    /// Insert a batch in one unit of work, isolating row-level failures
    async fn upsert_batch(&self, auctions: &[NewCetesAuction]) -> RepoResult<BatchOutcome>;

    /// Most recent row per maturity, ordered by maturity
    async fn latest_per_maturity(&self) -> RepoResult<Vec<CetesAuction>>;

    /// Newest rows for one maturity
    async fn recent_for_maturity(&self, maturity_days: i32, limit: i64) -> RepoResult<Vec<CetesAuction>>;

    async fn latest_for_maturity(&self, maturity_days: i32) -> RepoResult<Option<CetesAuction>>;

    async fn history(&self, query: &CetesHistoryQuery) -> RepoResult<Vec<CetesAuction>>;
}

#[async_trait]
pub trait SofipoStore: Send + Sync {
    /// Unconditional insert; returns the new id
    async fn insert(&self, snapshot: &NewSofipoSnapshot) -> RepoResult<i64>;

    /// Insert a batch in one unit of work, isolating row-level failures
    async fn insert_batch(&self, snapshots: &[NewSofipoSnapshot]) -> RepoResult<BatchOutcome>;

    /// Snapshots with a GAT nominal, highest first, across every observation date
    async fn top(&self, limit: i64) -> RepoResult<Vec<SofipoSnapshot>>;

    async fn list(&self, query: &SofipoListQuery) -> RepoResult<Vec<SofipoSnapshot>>;

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<SofipoSnapshot>>;
}

#[async_trait]
pub trait FondoStore: Send + Sync {
    /// Insert or refresh price and returns for `(ticker, fecha_actualizacion)`
    async fn upsert(&self, quote: &NewEtfQuote) -> RepoResult<()>;

    /// Priced quotes ranked by YTD return, nulls last, across every observation date
    async fn top_by_ytd(&self, limit: i64) -> RepoResult<Vec<EtfQuote>>;

    /// Quotes with a YTD return, best first, across every observation date
    async fn top_performers(&self, limit: i64) -> RepoResult<Vec<EtfQuote>>;

    async fn list(&self, query: &FondoListQuery) -> RepoResult<Vec<EtfQuote>>;

    /// Case-insensitive substring match on ticker or name
    async fn search(&self, term: &str, limit: i64) -> RepoResult<Vec<EtfQuote>>;

    async fn find_latest_by_ticker(&self, ticker: &str) -> RepoResult<Option<EtfQuote>>;
}
