use crate::error::RepositoryError;
use crate::models::{NewSofipoSnapshot, SofipoListQuery, SofipoSnapshot};
use crate::repositories::traits::{BatchOutcome, RepoResult, SofipoStore};
use async_trait::async_trait;
use sqlx::{Acquire, PgExecutor, PgPool};
use tracing::warn;

/// Repository for SOFIPO yield snapshots
pub struct SofipoRepository {
    pool: PgPool,
}

impl SofipoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_row<'e, E: PgExecutor<'e>>(
        executor: E,
        snapshot: &NewSofipoSnapshot,
    ) -> Result<i64, RepositoryError> {
        snapshot.validate().map_err(RepositoryError::InvalidInput)?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO sofipos (nombre, gat_nominal, gat_real, fecha_actualizacion)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(snapshot.name.trim())
        .bind(snapshot.gat_nominal)
        .bind(snapshot.gat_real)
        .bind(snapshot.observed_on)
        .fetch_one(executor)
        .await?;

        Ok(id)
    }
}

#[async_trait]
impl SofipoStore for SofipoRepository {
    async fn insert(&self, snapshot: &NewSofipoSnapshot) -> RepoResult<i64> {
        Self::insert_row(&self.pool, snapshot).await
    }

    async fn insert_batch(&self, snapshots: &[NewSofipoSnapshot]) -> RepoResult<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        if snapshots.is_empty() {
            return Ok(outcome);
        }

        let mut tx = self.pool.begin().await?;

        for snapshot in snapshots {
            let mut savepoint = (&mut tx).begin().await?;
            match Self::insert_row(&mut *savepoint, snapshot).await {
                Ok(_) => {
                    savepoint.commit().await?;
                    outcome.inserted += 1;
                }
                Err(e) if e.is_row_level() => {
                    warn!("Rolling back SOFIPO {}: {}", snapshot.name, e);
                    savepoint.rollback().await?;
                    outcome.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn top(&self, limit: i64) -> RepoResult<Vec<SofipoSnapshot>> {
        let rows = sqlx::query_as::<_, SofipoSnapshot>(
            r#"
            SELECT id, nombre, gat_nominal, gat_real, fecha_actualizacion
            FROM sofipos
            WHERE gat_nominal IS NOT NULL
            ORDER BY gat_nominal DESC, nombre, id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list(&self, query: &SofipoListQuery) -> RepoResult<Vec<SofipoSnapshot>> {
        // The sort column comes from a closed enum, never from raw input
        let sql = format!(
            r#"
            SELECT id, nombre, gat_nominal, gat_real, fecha_actualizacion
            FROM sofipos
            ORDER BY {} DESC NULLS LAST, id
            LIMIT $1 OFFSET $2
            "#,
            query.order_by.column()
        );

        let rows = sqlx::query_as::<_, SofipoSnapshot>(&sql)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<SofipoSnapshot>> {
        let row = sqlx::query_as::<_, SofipoSnapshot>(
            r#"
            SELECT id, nombre, gat_nominal, gat_real, fecha_actualizacion
            FROM sofipos
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
