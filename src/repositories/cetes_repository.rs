use crate::error::RepositoryError;
use crate::models::{CetesAuction, CetesHistoryQuery, NewCetesAuction};
use crate::repositories::traits::{BatchOutcome, CetesStore, RepoResult};
use async_trait::async_trait;
use sqlx::{Acquire, PgExecutor, PgPool};
use tracing::warn;

/// Repository for CETES auction data
pub struct CetesRepository {
    pool: PgPool,
}

impl CetesRepository {
    /// Create a new CetesRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_row<'e, E: PgExecutor<'e>>(
        executor: E,
        auction: &NewCetesAuction,
    ) -> Result<bool, RepositoryError> {
        auction.validate().map_err(RepositoryError::InvalidInput)?;

        let result = sqlx::query(
            r#"
            INSERT INTO cetes (plazo, tasa, fecha_subasta, fecha_vencimiento)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (plazo, fecha_subasta) DO NOTHING
            "#,
        )
        .bind(auction.maturity.days())
        .bind(auction.rate)
        .bind(auction.auction_date)
        .bind(auction.maturity_date)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CetesStore for CetesRepository {
    async fn upsert(&self, auction: &NewCetesAuction) -> RepoResult<bool> {
        Self::insert_row(&self.pool, auction).await
    }

    async fn upsert_batch(&self, auctions: &[NewCetesAuction]) -> RepoResult<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        if auctions.is_empty() {
            return Ok(outcome);
        }

        let mut tx = self.pool.begin().await?;

        for auction in auctions {
            // Each row gets a savepoint so one bad row cannot poison the batch
            let mut savepoint = (&mut tx).begin().await?;
            match Self::insert_row(&mut *savepoint, auction).await {
                Ok(inserted) => {
                    savepoint.commit().await?;
                    if inserted {
                        outcome.inserted += 1;
                    } else {
                        outcome.unchanged += 1;
                    }
                }
                Err(e) if e.is_row_level() => {
                    warn!(
                        "Rolling back CETES {} {}: {}",
                        auction.maturity, auction.auction_date, e
                    );
                    savepoint.rollback().await?;
                    outcome.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn latest_per_maturity(&self) -> RepoResult<Vec<CetesAuction>> {
        let rows = sqlx::query_as::<_, CetesAuction>(
            r#"
            SELECT DISTINCT ON (plazo)
                id, plazo, tasa, fecha_subasta, fecha_vencimiento
            FROM cetes
            ORDER BY plazo, fecha_subasta DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn recent_for_maturity(&self, maturity_days: i32, limit: i64) -> RepoResult<Vec<CetesAuction>> {
        let rows = sqlx::query_as::<_, CetesAuction>(
            r#"
            SELECT id, plazo, tasa, fecha_subasta, fecha_vencimiento
            FROM cetes
            WHERE plazo = $1
            ORDER BY fecha_subasta DESC
            LIMIT $2
            "#,
        )
        .bind(maturity_days)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn latest_for_maturity(&self, maturity_days: i32) -> RepoResult<Option<CetesAuction>> {
        let row = sqlx::query_as::<_, CetesAuction>(
            r#"
            SELECT id, plazo, tasa, fecha_subasta, fecha_vencimiento
            FROM cetes
            WHERE plazo = $1
            ORDER BY fecha_subasta DESC
            LIMIT 1
            "#,
        )
        .bind(maturity_days)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn history(&self, query: &CetesHistoryQuery) -> RepoResult<Vec<CetesAuction>> {
        let rows = sqlx::query_as::<_, CetesAuction>(
            r#"
            SELECT id, plazo, tasa, fecha_subasta, fecha_vencimiento
            FROM cetes
            WHERE plazo = $1
                AND ($2::date IS NULL OR fecha_subasta >= $2)
                AND ($3::date IS NULL OR fecha_subasta <= $3)
            ORDER BY fecha_subasta DESC
            LIMIT $4
            "#,
        )
        .bind(query.maturity_days)
        .bind(query.from)
        .bind(query.to)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
