use crate::error::RepositoryError;
use crate::models::{EtfQuote, FondoListQuery, NewEtfQuote};
use crate::repositories::traits::{FondoStore, RepoResult};
use async_trait::async_trait;
use sqlx::PgPool;

/// Repository for ETF / fund quotes
pub struct FondoRepository {
    pool: PgPool,
}

/// Escape LIKE metacharacters so user input only ever matches literally
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl FondoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FondoStore for FondoRepository {
    async fn upsert(&self, quote: &NewEtfQuote) -> RepoResult<()> {
        quote.validate().map_err(RepositoryError::InvalidInput)?;

        // Descriptive columns keep the values from the first insert of the day
        sqlx::query(
            r#"
            INSERT INTO fondos_etfs
                (ticker, nombre, tipo, mercado, precio_actual,
                 rendimiento_anual, rendimiento_ytd, fecha_actualizacion)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (ticker, fecha_actualizacion) DO UPDATE SET
                precio_actual = EXCLUDED.precio_actual,
                rendimiento_anual = EXCLUDED.rendimiento_anual,
                rendimiento_ytd = EXCLUDED.rendimiento_ytd
            "#,
        )
        .bind(&quote.ticker)
        .bind(quote.name.as_deref())
        .bind(quote.kind.map(|k| k.as_str()))
        .bind(quote.market.map(|m| m.as_str()))
        .bind(quote.current_price)
        .bind(quote.annual_return)
        .bind(quote.ytd_return)
        .bind(quote.observed_on)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn top_by_ytd(&self, limit: i64) -> RepoResult<Vec<EtfQuote>> {
        let rows = sqlx::query_as::<_, EtfQuote>(
            r#"
            SELECT id, ticker, nombre, tipo, mercado, precio_actual,
                   rendimiento_anual, rendimiento_ytd, fecha_actualizacion
            FROM fondos_etfs
            WHERE precio_actual IS NOT NULL
            ORDER BY rendimiento_ytd DESC NULLS LAST, ticker, fecha_actualizacion DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn top_performers(&self, limit: i64) -> RepoResult<Vec<EtfQuote>> {
        let rows = sqlx::query_as::<_, EtfQuote>(
            r#"
            SELECT id, ticker, nombre, tipo, mercado, precio_actual,
                   rendimiento_anual, rendimiento_ytd, fecha_actualizacion
            FROM fondos_etfs
            WHERE rendimiento_ytd IS NOT NULL
            ORDER BY rendimiento_ytd DESC, ticker, fecha_actualizacion DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list(&self, query: &FondoListQuery) -> RepoResult<Vec<EtfQuote>> {
        let rows = sqlx::query_as::<_, EtfQuote>(
            r#"
            SELECT id, ticker, nombre, tipo, mercado, precio_actual,
                   rendimiento_anual, rendimiento_ytd, fecha_actualizacion
            FROM fondos_etfs
            WHERE ($1::text IS NULL OR tipo = $1)
                AND ($2::text IS NULL OR mercado = $2)
            ORDER BY ticker, fecha_actualizacion DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(query.kind.as_deref())
        .bind(query.market.as_deref())
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn search(&self, term: &str, limit: i64) -> RepoResult<Vec<EtfQuote>> {
        let pattern = format!("%{}%", escape_like(term));

        let rows = sqlx::query_as::<_, EtfQuote>(
            r#"
            SELECT id, ticker, nombre, tipo, mercado, precio_actual,
                   rendimiento_anual, rendimiento_ytd, fecha_actualizacion
            FROM fondos_etfs
            WHERE ticker ILIKE $1 OR nombre ILIKE $1
            ORDER BY ticker, fecha_actualizacion DESC
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_latest_by_ticker(&self, ticker: &str) -> RepoResult<Option<EtfQuote>> {
        let row = sqlx::query_as::<_, EtfQuote>(
            r#"
            SELECT id, ticker, nombre, tipo, mercado, precio_actual,
                   rendimiento_anual, rendimiento_ytd, fecha_actualizacion
            FROM fondos_etfs
            WHERE ticker = $1
            ORDER BY fecha_actualizacion DESC
            LIMIT 1
            "#,
        )
        .bind(ticker.trim().to_uppercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
